// src/services/document_service.rs

use std::path::PathBuf;

use genpdf::{Element, elements, style};
use image::{DynamicImage, Luma};
use qrcode::QrCode;
use uuid::Uuid;

use crate::{
    common::{error::AppError, format::format_eur},
    models::receipt::ReceiptDetail,
};

const FONT_FAMILY: &str = "Roboto";

/// QR code of `content` as a grayscale image.
pub fn qr_image(content: &str) -> Result<DynamicImage, AppError> {
    let code = QrCode::new(content.as_bytes()).map_err(|e| AppError::PdfError(e.to_string()))?;
    Ok(DynamicImage::ImageLuma8(code.render::<Luma<u8>>().build()))
}

#[derive(Clone)]
pub struct DocumentService {
    fonts_dir: PathBuf,
    public_base_url: String,
}

impl DocumentService {
    pub fn new(fonts_dir: PathBuf, public_base_url: String) -> Self {
        Self {
            fonts_dir,
            public_base_url,
        }
    }

    /// Where a shopper claims the receipt from its QR code.
    pub fn claim_url(&self, receipt_id: Uuid) -> String {
        format!("{}/api/receipts/{}/claim", self.public_base_url, receipt_id)
    }

    pub fn receipt_pdf(&self, detail: &ReceiptDetail) -> Result<Vec<u8>, AppError> {
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, FONT_FAMILY, None)
            .map_err(|_| AppError::FontNotFound(self.fonts_dir.display().to_string()))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("Ticket {}", detail.short_id));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- header ---
        doc.push(elements::Paragraph::new(detail.store_name.clone()).styled(style::Style::new().bold().with_font_size(18)));
        doc.push(
            elements::Paragraph::new(format!("{} ({})", detail.terminal_name, detail.terminal_identifier))
                .styled(style::Style::new().with_font_size(10)),
        );
        doc.push(elements::Break::new(1.5));

        doc.push(
            elements::Paragraph::new(format!("TICKET #{}", detail.short_id))
                .styled(style::Style::new().bold().with_font_size(14)),
        );
        doc.push(elements::Paragraph::new(format!(
            "Date : {}",
            detail.receipt.created_at.format("%d/%m/%Y %H:%M")
        )));
        doc.push(elements::Paragraph::new(format!(
            "Client : {}",
            detail.customer_name.as_deref().unwrap_or("Client anonyme")
        )));
        doc.push(elements::Break::new(2));

        // --- lines ---
        let mut table = elements::TableLayout::new(vec![4, 1, 2, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let bold = style::Style::new().bold();
        table
            .row()
            .element(elements::Paragraph::new("Article").styled(bold))
            .element(elements::Paragraph::new("Qté").styled(bold))
            .element(elements::Paragraph::new("Prix unitaire").styled(bold))
            .element(elements::Paragraph::new("Total").styled(bold))
            .push()
            .map_err(|e| AppError::PdfError(e.to_string()))?;

        for item in &detail.line_items {
            table
                .row()
                .element(elements::Paragraph::new(format!("{} ({})", item.product_name, item.category)))
                .element(elements::Paragraph::new(item.quantity.to_string()))
                .element(elements::Paragraph::new(format_eur(item.unit_price)))
                .element(elements::Paragraph::new(format_eur(item.revenue())))
                .push()
                .map_err(|e| AppError::PdfError(e.to_string()))?;
        }

        doc.push(table);
        doc.push(elements::Break::new(2));

        let mut total = elements::Paragraph::new(format!("TOTAL : {}", format_eur(detail.receipt.total_amount)));
        total.set_alignment(genpdf::Alignment::Right);
        doc.push(total.styled(style::Style::new().bold().with_font_size(12)));
        doc.push(elements::Break::new(2));

        // --- claim QR code ---
        doc.push(
            elements::Paragraph::new("Retrouvez ce ticket dans votre espace fidélité")
                .styled(style::Style::new().bold().with_font_size(11)),
        );
        let pdf_image = elements::Image::from_dynamic_image(qr_image(&self.claim_url(detail.receipt.id))?)
            .map_err(|e| AppError::PdfError(e.to_string()))?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(pdf_image);

        let mut buffer = Vec::new();
        doc.render(&mut buffer)
            .map_err(|e| AppError::PdfError(e.to_string()))?;

        tracing::debug!(receipt_id = %detail.receipt.id, bytes = buffer.len(), "receipt pdf rendered");
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_url_points_at_the_claim_endpoint() {
        let docs = DocumentService::new(PathBuf::from("./fonts"), "https://bo.exemple.fr".into());
        let id = Uuid::nil();
        assert_eq!(
            docs.claim_url(id),
            "https://bo.exemple.fr/api/receipts/00000000-0000-0000-0000-000000000000/claim"
        );
    }

    #[test]
    fn qr_code_renders_a_square_image() {
        let image = qr_image("https://bo.exemple.fr/api/receipts/x/claim").unwrap();
        let gray = image.to_luma8();
        assert!(gray.width() > 0);
        assert_eq!(gray.width(), gray.height());
    }
}
