use std::time::Duration;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::AiConfig;
use crate::models::ChatLanguage;

/// System prompt anchoring the assistant to Cameroon's dual legal system.
const CAMEROON_LAW_CONTEXT: &str = "\
You are a specialized AI legal assistant focused on Cameroon law. You provide accurate, helpful information about:

LEGAL DOMAINS:
- Criminal Law: Penal Code, criminal procedures, penalties
- Family Law: Marriage, divorce, inheritance, child custody
- Property Law: Land ownership, real estate, property rights
- Business Law: Company registration, contracts, commercial law
- Employment Law: Labor code, worker rights, employment contracts
- Constitutional Law: Citizens' rights, government procedures

IMPORTANT GUIDELINES:
1. Always specify that this is general legal information, not legal advice
2. Recommend consulting with a qualified Cameroon lawyer for specific cases
3. Reference relevant Cameroon legal codes when applicable
4. Be clear about legal procedures and requirements
5. Explain both English and French legal traditions where relevant (Cameroon's dual legal system)

LEGAL REFERENCES:
- Cameroon Civil Code
- Cameroon Penal Code
- Labor Code of Cameroon
- Commercial Code
- Constitution of Cameroon (1996)";

const DEFAULT_DISCLAIMER: &str = "This information is for general guidance only and does not \
constitute legal advice. Please consult with a qualified Cameroon lawyer for your specific \
situation.";

#[derive(Debug, Error)]
pub enum AiError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("completion API returned status {0}")]
    Status(u16),

    #[error("completion payload missing content")]
    EmptyCompletion,
}

#[derive(Debug, Clone)]
pub struct LegalQuery {
    pub question: String,
    pub context: Option<String>,
    pub language: ChatLanguage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalAnswer {
    pub answer: String,
    pub category: String,
    pub confidence: Decimal,
    pub references: Vec<String>,
    pub disclaimer: String,
}

/// Client for an OpenAI-compatible chat-completions endpoint. Transient
/// failures retry with doubling delays up to the configured attempt cap;
/// once exhausted the caller gets a canned low-confidence answer so the chat
/// relay always has something to persist.
#[derive(Clone)]
pub struct AiLegalService {
    client: reqwest::Client,
    config: AiConfig,
}

impl AiLegalService {
    pub fn new(config: AiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub async fn answer(&self, query: &LegalQuery) -> LegalAnswer {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": CAMEROON_LAW_CONTEXT },
                { "role": "user", "content": build_prompt(query) },
            ],
            "response_format": { "type": "json_object" },
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        match self.complete_with_retry(&body).await {
            Ok(content) => parse_answer(&content),
            Err(e) => {
                tracing::error!("AI legal service error: {}", e);
                fallback_answer()
            }
        }
    }

    pub async fn categorize(&self, question: &str) -> String {
        let body = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "Categorize this legal question into one of these categories: \
                        Criminal Law, Family Law, Property Law, Business Law, Employment Law, \
                        Constitutional Law, or General Legal. Respond with just the category name.",
                },
                { "role": "user", "content": question },
            ],
            "temperature": 0.1,
            "max_tokens": 20,
        });

        match self.complete_with_retry(&body).await {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                tracing::warn!("Query categorization error: {}", e);
                "General Legal".to_string()
            }
        }
    }

    /// Bounded exponential backoff around a single completion request.
    async fn complete_with_retry(&self, body: &Value) -> Result<String, AiError> {
        let attempts = self.config.max_attempts.max(1);
        let mut delay = Duration::from_millis(self.config.retry_base_delay_ms);
        let mut last_err = AiError::EmptyCompletion;

        for attempt in 1..=attempts {
            match self.complete(body).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    tracing::warn!(attempt, "completion attempt failed: {}", e);
                    last_err = e;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
        Err(last_err)
    }

    async fn complete(&self, body: &Value) -> Result<String, AiError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::Status(response.status().as_u16()));
        }

        let payload: Value = response.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or(AiError::EmptyCompletion)
    }
}

fn build_prompt(query: &LegalQuery) -> String {
    let language = match query.language {
        ChatLanguage::Fr => "French",
        ChatLanguage::En => "English",
    };
    let context = query
        .context
        .as_ref()
        .map(|c| format!("\nAdditional Context: \"{}\"", c))
        .unwrap_or_default();

    format!(
        "Please provide legal information about the following question related to Cameroon law.\n\n\
         Question: \"{}\"{}\n\n\
         Respond in {} and format your response as JSON with these exact fields:\n\
         {{\n\
           \"answer\": \"Detailed legal information addressing the question (3-5 paragraphs)\",\n\
           \"category\": \"Primary legal category (e.g., Criminal Law, Family Law, Property Law, Business Law, Employment Law)\",\n\
           \"confidence\": 0.8,\n\
           \"references\": [\"List of relevant Cameroon legal codes or articles\"],\n\
           \"disclaimer\": \"Clear disclaimer that this is general information, not legal advice\"\n\
         }}\n\n\
         Focus on:\n\
         1. Accurate information based on Cameroon law\n\
         2. Practical steps or procedures when applicable\n\
         3. Required documents or legal requirements\n\
         4. Relevant legal codes and articles\n\
         5. Clear explanation of rights and obligations\n\n\
         Always include the standard disclaimer about seeking professional legal advice.",
        query.question, context, language
    )
}

/// Pull the structured answer out of the model's JSON, defaulting every
/// field so a sloppy completion still yields a usable reply.
fn parse_answer(content: &str) -> LegalAnswer {
    let parsed: Value = serde_json::from_str(content).unwrap_or(Value::Null);

    let confidence = parsed["confidence"]
        .as_f64()
        .and_then(Decimal::from_f64)
        .unwrap_or_else(|| Decimal::new(7, 1))
        .clamp(Decimal::ZERO, Decimal::ONE)
        .round_dp(2);

    LegalAnswer {
        answer: parsed["answer"]
            .as_str()
            .unwrap_or(
                "I apologize, but I couldn't generate a proper response to your legal question.",
            )
            .to_string(),
        category: parsed["category"].as_str().unwrap_or("General Legal").to_string(),
        confidence,
        references: parsed["references"]
            .as_array()
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| r.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default(),
        disclaimer: parsed["disclaimer"]
            .as_str()
            .unwrap_or(DEFAULT_DISCLAIMER)
            .to_string(),
    }
}

fn fallback_answer() -> LegalAnswer {
    LegalAnswer {
        answer: "I apologize, but I'm experiencing technical difficulties. Please try again \
                 later or consult with a qualified lawyer directly."
            .to_string(),
        category: "System Error".to_string(),
        confidence: Decimal::ZERO,
        references: vec![],
        disclaimer: "This system is currently unavailable. Please seek professional legal \
                     advice for your questions."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(language: ChatLanguage) -> LegalQuery {
        LegalQuery {
            question: "How do I register a business in Douala?".into(),
            context: None,
            language,
        }
    }

    #[test]
    fn prompt_carries_question_and_language() {
        let p = build_prompt(&query(ChatLanguage::En));
        assert!(p.contains("How do I register a business in Douala?"));
        assert!(p.contains("Respond in English"));

        let p = build_prompt(&query(ChatLanguage::Fr));
        assert!(p.contains("Respond in French"));
    }

    #[test]
    fn prompt_includes_optional_context() {
        let mut q = query(ChatLanguage::En);
        q.context = Some("The business is a sole proprietorship".into());
        let p = build_prompt(&q);
        assert!(p.contains("Additional Context"));
        assert!(p.contains("sole proprietorship"));
    }

    #[test]
    fn parse_extracts_all_fields() {
        let content = r#"{
            "answer": "You must register with the trade registry.",
            "category": "Business Law",
            "confidence": 0.85,
            "references": ["Commercial Code, Art. 12"],
            "disclaimer": "General information only."
        }"#;
        let answer = parse_answer(content);
        assert_eq!(answer.category, "Business Law");
        assert_eq!(answer.confidence, Decimal::new(85, 2));
        assert_eq!(answer.references, vec!["Commercial Code, Art. 12"]);
    }

    #[test]
    fn parse_clamps_out_of_range_confidence() {
        let answer = parse_answer(r#"{"answer": "x", "confidence": 3.7}"#);
        assert_eq!(answer.confidence, Decimal::ONE);

        let answer = parse_answer(r#"{"answer": "x", "confidence": -2}"#);
        assert_eq!(answer.confidence, Decimal::ZERO);
    }

    #[test]
    fn parse_defaults_on_malformed_payload() {
        let answer = parse_answer("not json at all");
        assert_eq!(answer.category, "General Legal");
        assert_eq!(answer.confidence, Decimal::new(7, 1));
        assert_eq!(answer.disclaimer, DEFAULT_DISCLAIMER);
        assert!(answer.references.is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_fallback() {
        let service = AiLegalService::new(AiConfig {
            api_base: "http://127.0.0.1:9".into(),
            api_key: String::new(),
            model: "gpt-4o".into(),
            temperature: 0.3,
            max_tokens: 64,
            max_attempts: 2,
            retry_base_delay_ms: 1,
        });

        let answer = service.answer(&query(ChatLanguage::En)).await;
        assert_eq!(answer.category, "System Error");
        assert_eq!(answer.confidence, Decimal::ZERO);
    }
}
