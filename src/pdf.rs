//! On-demand PDF generation for tax documents.
//!
//! Documents are laid out as fixed-position Helvetica text on US letter
//! pages (612x792 points) and regenerated from the stored tax record on
//! every download; nothing is cached on disk.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::models::donation;
use crate::models::tax_record;

const PAGE_TOP: i64 = 720;
const PAGE_BOTTOM: i64 = 80;
const LINE_HEIGHT: i64 = 16;
const MARGIN: i64 = 72;

struct TextLine {
    x: i64,
    y: i64,
    size: i64,
    text: String,
}

/// Accumulates text lines, starting a new page when vertical space runs out.
struct PageWriter {
    pages: Vec<Vec<TextLine>>,
    current: Vec<TextLine>,
    y: i64,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_TOP,
        }
    }

    fn title(&mut self, text: &str) {
        self.current.push(TextLine {
            x: MARGIN,
            y: 740,
            size: 18,
            text: text.to_string(),
        });
    }

    fn line(&mut self, text: impl Into<String>) {
        self.sized_line(11, text);
    }

    fn heading(&mut self, text: impl Into<String>) {
        self.sized_line(13, text);
    }

    fn sized_line(&mut self, size: i64, text: impl Into<String>) {
        if self.y < PAGE_BOTTOM {
            let page = std::mem::take(&mut self.current);
            self.pages.push(page);
            self.y = PAGE_TOP;
        }
        self.current.push(TextLine {
            x: MARGIN,
            y: self.y,
            size,
            text: text.into(),
        });
        self.y -= LINE_HEIGHT;
    }

    fn gap(&mut self) {
        self.y -= LINE_HEIGHT;
    }

    fn render(mut self) -> Result<Vec<u8>, lopdf::Error> {
        self.pages.push(self.current);

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in &self.pages {
            let mut operations = Vec::new();
            for line in lines {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), line.size.into()]));
                operations.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(line.text.as_str())],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = self.pages.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        Ok(buffer)
    }
}

fn money(value: f64) -> String {
    format!("${:.2}", value)
}

/// Schedule A: one line per donation with pagination, then the totals.
pub fn schedule_a(
    record: &tax_record::Model,
    user_name: &str,
) -> Result<Vec<u8>, lopdf::Error> {
    let mut page = PageWriter::new();
    page.title("Schedule A - Charitable Contributions");
    page.line(format!("Tax Year: {}", record.tax_year));
    page.line(format!("Prepared for: {}", user_name));
    page.gap();
    page.heading("Gifts to Charity");
    page.gap();

    for item in &record.donations.0 {
        page.line(format!(
            "{}  {} (EIN {})  {}",
            item.date.format("%Y-%m-%d"),
            item.charity_name,
            item.charity_ein,
            money(item.amount),
        ));
    }

    page.gap();
    page.heading(format!(
        "Total Contributions: {}",
        money(record.summary.total_donations)
    ));
    page.line(format!(
        "Total Tax Deductible: {}",
        money(record.summary.total_tax_deductible)
    ));

    page.render()
}

/// Annual donation receipt summarizing the year's giving.
pub fn annual_receipt(
    record: &tax_record::Model,
    user_name: &str,
) -> Result<Vec<u8>, lopdf::Error> {
    let mut page = PageWriter::new();
    page.title("Donation Receipt");
    page.line(format!("Tax Year: {}", record.tax_year));
    page.line(format!("Donor: {}", user_name));
    page.gap();
    page.line(format!(
        "Number of Donations: {}",
        record.summary.donation_count
    ));
    page.line(format!(
        "Charities Supported: {}",
        record.summary.unique_charities
    ));
    page.line(format!(
        "Total Donated: {}",
        money(record.summary.total_donations)
    ));
    page.line(format!(
        "Tax Deductible Amount: {}",
        money(record.summary.total_tax_deductible)
    ));
    page.gap();
    page.line("Keep this receipt with your tax records.");

    page.render()
}

/// Annual giving summary document.
pub fn annual_summary(
    record: &tax_record::Model,
    user_name: &str,
) -> Result<Vec<u8>, lopdf::Error> {
    let mut page = PageWriter::new();
    page.title("Annual Giving Summary");
    page.line(format!("Tax Year: {}", record.tax_year));
    page.line(format!("Donor: {}", user_name));
    page.gap();
    page.heading("Summary");
    page.line(format!(
        "Total Donations: {}",
        money(record.summary.total_donations)
    ));
    page.line(format!(
        "Tax Deductible: {}",
        money(record.summary.total_tax_deductible)
    ));
    page.line(format!("Donation Count: {}", record.summary.donation_count));
    page.line(format!(
        "Unique Charities: {}",
        record.summary.unique_charities
    ));
    page.gap();
    page.heading("Donations");
    for item in &record.donations.0 {
        page.line(format!(
            "{}  {}  {}",
            item.date.format("%Y-%m-%d"),
            item.charity_name,
            money(item.amount),
        ));
    }

    page.render()
}

/// Receipt for a single completed donation.
pub fn donation_receipt(
    donation: &donation::Model,
    charity_name: &str,
    charity_ein: &str,
    user_name: &str,
) -> Result<Vec<u8>, lopdf::Error> {
    let mut page = PageWriter::new();
    page.title("Donation Receipt");
    page.line(format!("Receipt for: {}", user_name));
    page.line(format!(
        "Date: {}",
        donation.created_at.format("%Y-%m-%d")
    ));
    page.gap();
    page.line(format!("Charity: {} (EIN {})", charity_name, charity_ein));
    page.line(format!("Donation Amount: {}", money(donation.amount)));
    page.line(format!(
        "Employer Match: {}",
        money(donation.matching_amount)
    ));
    page.line(format!(
        "Total Contribution: {}",
        money(donation.total_amount)
    ));
    page.gap();
    if donation.tax_info.tax_deductible {
        page.line("This donation is tax deductible. No goods or services were provided.");
    } else {
        page.line("This donation is not tax deductible.");
    }

    page.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tax_record::{
        TaxDocuments, TaxLineItem, TaxLineItems, TaxRecordStatus, TaxSummary,
    };
    use chrono::Utc;
    use uuid::Uuid;

    fn record_with_items(count: usize) -> tax_record::Model {
        let items: Vec<TaxLineItem> = (0..count)
            .map(|i| TaxLineItem {
                donation_id: Uuid::new_v4(),
                charity_name: format!("Charity {i}"),
                charity_ein: format!("12-34567{i:02}"),
                amount: 25.0,
                date: Utc::now(),
                is_tax_deductible: true,
            })
            .collect();

        tax_record::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            tax_year: 2025,
            summary: TaxSummary {
                total_donations: 25.0 * count as f64,
                total_tax_deductible: 25.0 * count as f64,
                donation_count: count as i64,
                unique_charities: count as i64,
            },
            donations: TaxLineItems(items),
            documents: TaxDocuments::all_generated(Utc::now()),
            status: TaxRecordStatus::Generated,
            generated_at: Some(Utc::now().into()),
            downloaded_at: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn schedule_a_is_a_valid_pdf() {
        let record = record_with_items(3);
        let bytes = schedule_a(&record, "Ada Lovelace").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_schedule_a_paginates() {
        let record = record_with_items(90);
        let bytes = schedule_a(&record, "Ada Lovelace").unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 2);
    }

    #[test]
    fn annual_documents_render() {
        let record = record_with_items(2);
        assert!(annual_receipt(&record, "Ada").unwrap().starts_with(b"%PDF"));
        assert!(annual_summary(&record, "Ada").unwrap().starts_with(b"%PDF"));
    }
}
