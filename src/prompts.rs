//! Instruction prompt for tariff extraction.
//!
//! The prompt is the output contract with the extraction model: it names the
//! seven fields of [`crate::analysis::TariffAnalysis`] and the two hard rules
//! (only tariff-attributed figures; empty lists when there are none). Keeping
//! it here lets unit tests inspect it without a network call.

/// Instructions placed before the document text.
pub const EXTRACTION_INSTRUCTIONS: &str = r#"As a specialized financial analyst, your task is to analyze the following corporate document.
Your focus must be exclusively on comments related to **tariffs, trade duties, and import taxes**.

**Critical Rule:** You must ignore all general financial metrics (e.g., overall revenue, total orders, EBITA) unless the text explicitly states that tariffs are the cause of the financial impact. If no specific financial data related to tariffs is mentioned, the corresponding fields in your response must be an empty list `[]`.

Extract the information and structure your response as a valid JSON object. If a specific piece of information is not mentioned, use `null` or an empty list.

JSON Specification:
- **company_name**: The full company name mentioned in the document.
- **quarterly_impact**: A list of objects with the keys `metric`, `impact_value`, `unit` and `source_quote`, detailing financial impacts **explicitly attributed to tariffs** in the current quarter. Examples: "Tariffs increased costs by $5M," or "Gross margin was impacted by 20 basis points due to import duties." If no such specific financial impact is mentioned, this MUST be an empty list.
- **forward_guidance_impact**: A list of objects with the same keys, detailing future financial guidance **explicitly related to tariffs**. If none is mentioned, this MUST be an empty list.
- **qualitative_impacts**: A list of strings describing non-financial impacts or general business environment effects due to tariffs. Examples: "Customer project delays due to tariff uncertainty," or "Increased complexity in supply chain planning."
- **mitigation_strategies**: A list of strings detailing the specific strategies or actions the company is taking to handle the impact of tariffs.
- **overall_sentiment**: Your assessment of the company's sentiment regarding tariffs ("Positive", "Neutral", "Negative"). This should be based only on the tariff-related comments.
- **summary**: A brief, one-paragraph summary of the company's position on tariffs, synthesizing ONLY the specific findings. If the document provides few specifics, your summary must state that."#;

/// Build the full user message for one document.
///
/// `document` must already be truncated to the configured budget.
pub fn extraction_prompt(document: &str) -> String {
    format!(
        "{}\n\nDocument Text:\n---\n{}\n---\n",
        EXTRACTION_INSTRUCTIONS, document
    )
}
