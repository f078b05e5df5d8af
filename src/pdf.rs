//! PDF rendering for tickets, receipts and passenger manifests.
//!
//! Layouts are fixed A4 pages drawn with the builtin Helvetica fonts. The
//! ticket carries a QR code drawn module by module as filled squares.

use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rect, Rgb,
};
use qrcode::QrCode;

use crate::error::AppError;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const LAYER: &str = "content";

/// Everything printed on a boarding ticket.
#[derive(Debug, Clone)]
pub struct TicketData {
    pub business_name: String,
    pub service_name: String,
    pub departure_at: DateTime<Utc>,
    pub ref_code: String,
    pub customer_name: String,
    pub pax: i32,
    pub passengers: Vec<String>,
    pub verification_url: String,
}

/// Everything printed on a payment receipt.
#[derive(Debug, Clone)]
pub struct ReceiptData {
    pub business_name: String,
    pub ref_code: String,
    pub customer_name: String,
    pub customer_email: String,
    pub service_name: String,
    pub departure_at: DateTime<Utc>,
    pub pax: i32,
    pub amount_cents: i64,
    pub currency: String,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub ref_code: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub pax: i32,
    pub checked_in: bool,
    pub passengers: Vec<String>,
}

/// Passenger manifest for one departure.
#[derive(Debug, Clone)]
pub struct ManifestData {
    pub business_name: String,
    pub service_name: String,
    pub departure_at: DateTime<Utc>,
    pub capacity: i32,
    pub entries: Vec<ManifestEntry>,
}

impl ManifestData {
    pub fn total_pax(&self) -> i32 {
        self.entries.iter().map(|e| e.pax).sum()
    }

    pub fn checked_in_pax(&self) -> i32 {
        self.entries
            .iter()
            .filter(|e| e.checked_in)
            .map(|e| e.pax)
            .sum()
    }
}

/// `MYR 240.00`
pub fn format_money(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{currency} {sign}{}.{:02}", abs / 100, abs % 100)
}

fn format_departure(at: DateTime<Utc>) -> String {
    at.format("%a %d %b %Y, %H:%M UTC").to_string()
}

/// Cursor-based writer that starts a new page when the current one fills.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, AppError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::Document(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::Document(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    /// Start a new page if fewer than `needed` mm remain.
    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed < MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
            self.pages += 1;
        }
    }

    fn write(&mut self, text: &str, size: f32, bold: bool, indent: f32) {
        let line_height = size * 0.5;
        self.ensure_space(line_height);
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(text, size, Mm(MARGIN + indent), Mm(self.y), font);
        self.y -= line_height;
    }

    fn heading(&mut self, text: &str) {
        self.write(text, 20.0, true, 0.0);
        self.gap(2.0);
    }

    fn line(&mut self, text: &str) {
        self.write(text, 11.0, false, 0.0);
    }

    fn field(&mut self, label: &str, value: &str) {
        self.write(&format!("{label}: {value}"), 11.0, false, 0.0);
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    /// Draw `data` as a QR code of `size` mm, top-left at the cursor.
    fn qr(&mut self, data: &str, size: f32) -> Result<(), AppError> {
        let code = QrCode::new(data.as_bytes()).map_err(|e| AppError::Document(e.to_string()))?;
        let matrix = QrMatrix::from(&code);

        self.ensure_space(size);
        let module = size / matrix.width as f32;
        let top = self.y;

        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        for (x, y) in matrix.dark_modules() {
            let llx = MARGIN + x as f32 * module;
            let ury = top - y as f32 * module;
            self.layer.add_rect(Rect::new(
                Mm(llx),
                Mm(ury - module),
                Mm(llx + module),
                Mm(ury),
            ));
        }

        self.y -= size;
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, AppError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| AppError::Document(e.to_string()))
    }
}

/// Dark/light module grid of a QR code.
#[derive(Debug, Clone)]
pub struct QrMatrix {
    pub width: usize,
    dark: Vec<bool>,
}

impl From<&QrCode> for QrMatrix {
    fn from(code: &QrCode) -> Self {
        Self {
            width: code.width(),
            dark: code
                .to_colors()
                .into_iter()
                .map(|c| c == qrcode::Color::Dark)
                .collect(),
        }
    }
}

impl QrMatrix {
    /// `(column, row)` of every dark module, row 0 at the top.
    pub fn dark_modules(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.dark
            .iter()
            .enumerate()
            .filter(|(_, dark)| **dark)
            .map(move |(i, _)| (i % width, i / width))
    }
}

/// Render a boarding ticket.
pub fn render_ticket(ticket: &TicketData) -> Result<Vec<u8>, AppError> {
    let mut page = PageWriter::new(&format!("Ticket {}", ticket.ref_code))?;

    page.heading(&ticket.business_name);
    page.write("Boarding ticket", 14.0, true, 0.0);
    page.gap(4.0);

    page.field("Booking reference", &ticket.ref_code);
    page.field("Trip", &ticket.service_name);
    page.field("Departure", &format_departure(ticket.departure_at));
    page.field("Lead passenger", &ticket.customer_name);
    page.field("Passengers", &ticket.pax.to_string());
    page.gap(4.0);

    if !ticket.passengers.is_empty() {
        page.write("Passenger list", 12.0, true, 0.0);
        for (n, name) in ticket.passengers.iter().enumerate() {
            page.line(&format!("{}. {}", n + 1, name));
        }
        page.gap(4.0);
    }

    page.qr(&ticket.verification_url, 50.0)?;
    page.gap(4.0);
    page.line("Show this code at the pier. Staff will scan it to check you in.");

    page.finish()
}

/// Render a payment receipt.
pub fn render_receipt(receipt: &ReceiptData) -> Result<Vec<u8>, AppError> {
    let mut page = PageWriter::new(&format!("Receipt {}", receipt.ref_code))?;

    page.heading(&receipt.business_name);
    page.write("Payment receipt", 14.0, true, 0.0);
    page.gap(4.0);

    page.field("Booking reference", &receipt.ref_code);
    page.field("Billed to", &format!("{} <{}>", receipt.customer_name, receipt.customer_email));
    page.field("Trip", &receipt.service_name);
    page.field("Departure", &format_departure(receipt.departure_at));
    page.field("Passengers", &receipt.pax.to_string());
    page.gap(4.0);

    page.write(
        &format!("Amount paid: {}", format_money(receipt.amount_cents, &receipt.currency)),
        13.0,
        true,
        0.0,
    );
    if let Some(txn) = &receipt.transaction_id {
        page.field("Transaction", txn);
    }
    if let Some(paid_at) = receipt.paid_at {
        page.field("Paid at", &paid_at.format("%d %b %Y, %H:%M UTC").to_string());
    }

    page.finish()
}

/// Render the passenger manifest of a departure.
pub fn render_manifest(manifest: &ManifestData) -> Result<Vec<u8>, AppError> {
    let page = write_manifest(manifest)?;
    tracing::debug!(pages = page.pages, entries = manifest.entries.len(), "Manifest rendered");
    page.finish()
}

fn write_manifest(manifest: &ManifestData) -> Result<PageWriter, AppError> {
    let mut page = PageWriter::new(&format!(
        "Manifest {} {}",
        manifest.service_name,
        manifest.departure_at.format("%Y-%m-%d %H:%M")
    ))?;

    page.heading(&manifest.business_name);
    page.write("Passenger manifest", 14.0, true, 0.0);
    page.gap(2.0);
    page.field("Trip", &manifest.service_name);
    page.field("Departure", &format_departure(manifest.departure_at));
    page.field(
        "Booked",
        &format!(
            "{} of {} seats, {} checked in",
            manifest.total_pax(),
            manifest.capacity,
            manifest.checked_in_pax()
        ),
    );
    page.gap(6.0);

    if manifest.entries.is_empty() {
        page.line("No confirmed bookings.");
    }

    for entry in &manifest.entries {
        let mark = if entry.checked_in { "[x]" } else { "[ ]" };
        page.write(
            &format!(
                "{mark} {}  {}  ({} pax)",
                entry.ref_code, entry.customer_name, entry.pax
            ),
            11.0,
            true,
            0.0,
        );
        if let Some(phone) = &entry.customer_phone {
            page.write(phone, 10.0, false, 8.0);
        }
        for name in &entry.passengers {
            page.write(name, 10.0, false, 8.0);
        }
        page.gap(2.0);
    }

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn departure() -> DateTime<Utc> {
        "2026-03-01T09:30:00Z".parse().expect("valid timestamp")
    }

    #[rstest]
    #[case(24_000, "MYR", "MYR 240.00")]
    #[case(5, "USD", "USD 0.05")]
    #[case(0, "EUR", "EUR 0.00")]
    #[case(-1_250, "MYR", "MYR -12.50")]
    fn formats_money(#[case] cents: i64, #[case] currency: &str, #[case] expected: &str) {
        assert_eq!(format_money(cents, currency), expected);
    }

    #[rstest]
    fn departure_format_is_readable(departure: DateTime<Utc>) {
        assert_eq!(format_departure(departure), "Sun 01 Mar 2026, 09:30 UTC");
    }

    #[rstest]
    fn qr_matrix_has_finder_pattern() {
        let code = QrCode::new(b"https://tours.example.com/verify/BT-7KQ2MZ9X").expect("encodes");
        let matrix = QrMatrix::from(&code);
        let dark: Vec<_> = matrix.dark_modules().collect();

        assert!(matrix.width >= 21);
        // Top-left finder pattern corners are always dark
        assert!(dark.contains(&(0, 0)));
        assert!(dark.contains(&(6, 0)));
        assert!(dark.contains(&(0, 6)));
        assert!(dark.iter().all(|&(x, y)| x < matrix.width && y < matrix.width));
    }

    #[rstest]
    fn ticket_renders_as_pdf(departure: DateTime<Utc>) {
        let bytes = render_ticket(&TicketData {
            business_name: "Coral Bay Cruises".to_string(),
            service_name: "Sunset Island Hop".to_string(),
            departure_at: departure,
            ref_code: "BT-7KQ2MZ9X".to_string(),
            customer_name: "Aisha Rahman".to_string(),
            pax: 2,
            passengers: vec!["Aisha Rahman".to_string(), "Daniel Lim".to_string()],
            verification_url: "https://tours.example.com/verify/BT-7KQ2MZ9X".to_string(),
        })
        .expect("renders");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[rstest]
    fn receipt_renders_as_pdf(departure: DateTime<Utc>) {
        let bytes = render_receipt(&ReceiptData {
            business_name: "Coral Bay Cruises".to_string(),
            ref_code: "BT-7KQ2MZ9X".to_string(),
            customer_name: "Aisha Rahman".to_string(),
            customer_email: "aisha@example.com".to_string(),
            service_name: "Sunset Island Hop".to_string(),
            departure_at: departure,
            pax: 2,
            amount_cents: 24_000,
            currency: "MYR".to_string(),
            transaction_id: Some("txn_93f1c2".to_string()),
            paid_at: Some(departure),
        })
        .expect("renders");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[rstest]
    fn long_manifest_spills_onto_more_pages(departure: DateTime<Utc>) {
        let entries: Vec<ManifestEntry> = (0..60)
            .map(|n| ManifestEntry {
                ref_code: format!("BT-AAAA{n:04}"),
                customer_name: format!("Customer {n}"),
                customer_phone: Some("+60 12 345 6789".to_string()),
                pax: 2,
                checked_in: n % 3 == 0,
                passengers: vec![format!("Passenger {n}a"), format!("Passenger {n}b")],
            })
            .collect();
        let manifest = ManifestData {
            business_name: "Coral Bay Cruises".to_string(),
            service_name: "Sunset Island Hop".to_string(),
            departure_at: departure,
            capacity: 150,
            entries,
        };

        assert_eq!(manifest.total_pax(), 120);
        assert_eq!(manifest.checked_in_pax(), 40);

        let short = write_manifest(&ManifestData {
            entries: manifest.entries[..1].to_vec(),
            ..manifest.clone()
        })
        .expect("renders");
        let long = write_manifest(&manifest).expect("renders");

        assert_eq!(short.pages, 1);
        // Each entry with a phone and two passengers is 22.5mm tall
        assert!(long.pages >= 5, "rendered {} pages", long.pages);
        assert!(long.finish().expect("finishes").starts_with(b"%PDF"));
    }

    #[rstest]
    fn empty_manifest_still_renders(departure: DateTime<Utc>) {
        let bytes = render_manifest(&ManifestData {
            business_name: "Coral Bay Cruises".to_string(),
            service_name: "Sunset Island Hop".to_string(),
            departure_at: departure,
            capacity: 20,
            entries: Vec::new(),
        })
        .expect("renders");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
