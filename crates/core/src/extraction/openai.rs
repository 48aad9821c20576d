//! OpenAI chat-completions extractor.

use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::error::ExtractionError;
use super::types::{InvoiceExtractor, RawExtraction};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// System prompt for invoice extraction.
///
/// The invoices are Danish; the prompt pins down the quirks that otherwise
/// produce garbage: comma decimals, quantity suffixes (PCS/STK), the logo
/// standing in for the supplier name, and the requirement to return every
/// line of the item table. The `frieght_amount` spelling is load-bearing,
/// stored invoices were extracted with it.
const EXTRACTION_PROMPT: &str = r#"You are an invoice extraction engine. Extract facts only from the provided PDF text and the provided logo image.

You MUST extract ALL invoice lines (line items). Each row of the item table is one line, numbered sequentially from 1; include a line even when some of its fields are missing. If the invoice spans multiple pages, extract lines from all pages.

Do not guess. If a field is not explicitly present, output null. The invoice language is Danish. A ',' in a number is a decimal point. Quantity is a number and may carry a suffix such as PCS or STK. VAT can appear with a '%' sign. Discounts appear in columns named Rabat, Discount, or Afslag and may be a percentage or a fixed amount; extract the printed value into "discount", the summed discount amount into "discount_total", and the amount after discount into "net_amount"; null when absent.

The logo image stands for the supplier; confirm the supplier name against the top of the invoice text. The supplier name never appears inside the line items.

Return ONLY valid JSON matching this shape exactly, no markdown, no commentary:
{
  "supplier_name": null,
  "invoice_number": null,
  "invoice_date": null,
  "currency": null,
  "subtotal_amount": null,
  "tax_amount": null,
  "frieght_amount": null,
  "total_amount": null,
  "lines": [
    {
      "line_no": 1,
      "sku": null,
      "product_name": null,
      "description": null,
      "quantity": null,
      "unit": null,
      "unit_price": null,
      "discount": null,
      "discount_total": null,
      "net_amount": null,
      "vat_percentage": null,
      "line_total": null
    }
  ],
  "warnings": []
}"#;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Production extractor calling the OpenAI chat-completions API in JSON
/// mode at temperature zero.
pub struct OpenAiExtractor {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiExtractor {
    /// Create an extractor for the given API key and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: CHAT_COMPLETIONS_URL.to_string(),
        }
    }

    /// Override the endpoint URL. Used by tests.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl InvoiceExtractor for OpenAiExtractor {
    async fn extract_invoice(
        &self,
        text: &str,
        logo_png: Option<&[u8]>,
    ) -> Result<RawExtraction, ExtractionError> {
        let mut content_parts = vec![json!({
            "type": "text",
            "text": format!("Extract invoice data from the following PDF text:\n\n{text}"),
        })];

        if let Some(png) = logo_png {
            let encoded = base64::engine::general_purpose::STANDARD.encode(png);
            content_parts.push(json!({
                "type": "image_url",
                "image_url": { "url": format!("data:image/png;base64,{encoded}") },
            }));
        }

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": EXTRACTION_PROMPT },
                { "role": "user", "content": content_parts },
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.0,
        });

        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::Collaborator(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Collaborator(format!(
                "openai returned {status}: {detail}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ExtractionError::InvalidResponse("empty choices".into()))?;

        debug!(model = %self.model, bytes = content.len(), "Received extraction response");

        serde_json::from_str(content)
            .map_err(|e| ExtractionError::InvalidResponse(format!("not extraction json: {e}")))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
