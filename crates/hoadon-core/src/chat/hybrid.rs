//! Routing between an external NLU service and the local chat handler.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::handler::{ChatHandler, ChatResponse, ResponseKind};
use super::intent::{is_invoice_related, Intent};
use crate::error::Result;
use crate::models::config::ChatConfig;

/// Intent name NLU services use when they did not understand the message.
pub const NLU_FALLBACK_INTENT: &str = "nlu_fallback";

/// Classifier confidence above which an invoice-related prediction wins outright.
const DOMAIN_CONFIDENCE: f32 = 0.9;
/// Below this neither model is trusted.
const LOW_CONFIDENCE: f32 = 0.5;
const LLM_FALLBACK_CONFIDENCE: f32 = 0.3;

const FALLBACK_REPLY: &str =
    "Xin lỗi, tôi không thể xử lý câu hỏi này. Vui lòng thử lại hoặc liên hệ hỗ trợ.";
const FALLBACK_CONFIDENCE: f32 = 0.1;

/// Reply from an NLU service such as Rasa.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RasaReply {
    pub text: String,
    pub intent: String,
    pub confidence: f32,
    #[serde(default)]
    pub entities: Vec<Value>,
}

/// Whether an NLU reply can be shown as is.
pub fn is_good_response(reply: &RasaReply, threshold: f32) -> bool {
    if reply.confidence < threshold {
        debug!("NLU confidence {} below threshold {}", reply.confidence, threshold);
        return false;
    }
    if reply.text.trim().is_empty() {
        debug!("NLU reply is empty");
        return false;
    }
    reply.intent != NLU_FALLBACK_INTENT
}

/// Output of an intent classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierPrediction {
    pub intent: String,
    pub confidence: f32,
    pub is_invoice_related: bool,
}

/// Confidence thresholds for [`decide_final_response`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub rasa: f32,
    pub classifier: f32,
}

impl Thresholds {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            rasa: config.rasa_confidence_threshold,
            classifier: config.bert_confidence_threshold,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

/// Which model's answer was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Both models agree; the NLU reply is used.
    RasaConfirmed,
    Classifier,
    Rasa,
    /// Nobody is confident; an LLM should answer.
    LlmFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub source: DecisionSource,
    pub intent: Option<String>,
    pub confidence: f32,
    pub response: String,
    /// The response is a placeholder an LLM should rewrite.
    pub use_llm: bool,
}

/// Choose between a classifier prediction and an NLU reply. Rules apply in order.
pub fn decide_final_response(
    classifier: &ClassifierPrediction,
    rasa: &RasaReply,
    thresholds: &Thresholds,
) -> RoutingDecision {
    if classifier.intent == rasa.intent
        && classifier.confidence > thresholds.classifier
        && rasa.confidence > thresholds.rasa
    {
        return RoutingDecision {
            source: DecisionSource::RasaConfirmed,
            intent: Some(rasa.intent.clone()),
            confidence: classifier.confidence.min(rasa.confidence),
            response: rasa.text.clone(),
            use_llm: false,
        };
    }

    if classifier.confidence > DOMAIN_CONFIDENCE && classifier.is_invoice_related {
        return RoutingDecision {
            source: DecisionSource::Classifier,
            intent: Some(classifier.intent.clone()),
            confidence: classifier.confidence,
            response: format!(
                "Tôi hiểu bạn muốn {}. Tôi sẽ hỗ trợ bạn với điều đó.",
                classifier.intent
            ),
            use_llm: true,
        };
    }

    if rasa.confidence > thresholds.rasa && !rasa.text.trim().is_empty() {
        return rasa_decision(rasa);
    }

    if classifier.confidence.max(rasa.confidence) < LOW_CONFIDENCE {
        return RoutingDecision {
            source: DecisionSource::LlmFallback,
            intent: None,
            confidence: LLM_FALLBACK_CONFIDENCE,
            response: "Tôi cần suy nghĩ về câu hỏi này...".to_string(),
            use_llm: true,
        };
    }

    if classifier.confidence > rasa.confidence {
        RoutingDecision {
            source: DecisionSource::Classifier,
            intent: Some(classifier.intent.clone()),
            confidence: classifier.confidence,
            response: format!("Dựa trên hiểu biết của tôi, bạn đang {}.", classifier.intent),
            use_llm: true,
        }
    } else {
        rasa_decision(rasa)
    }
}

fn rasa_decision(rasa: &RasaReply) -> RoutingDecision {
    RoutingDecision {
        source: DecisionSource::Rasa,
        intent: Some(rasa.intent.clone()),
        confidence: rasa.confidence,
        response: rasa.text.clone(),
        use_llm: false,
    }
}

/// External NLU service.
pub trait NluBackend: Send + Sync {
    fn name(&self) -> &str;

    fn parse(&self, message: &str, user_id: &str) -> Result<RasaReply>;
}

/// Where a routed reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Rasa,
    Chatbot,
    Fallback,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplySource::Rasa => "rasa",
            ReplySource::Chatbot => "chatbot",
            ReplySource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HybridReply {
    pub source: ReplySource,
    pub response: ChatResponse,
}

/// Tries the NLU service first and falls back to the local handler.
pub struct HybridRouter {
    handler: ChatHandler,
    nlu: Option<Box<dyn NluBackend>>,
    reply_threshold: f32,
    thresholds: Thresholds,
}

impl HybridRouter {
    pub fn new(handler: ChatHandler) -> Self {
        let reply_threshold = handler.config().rasa_reply_threshold;
        let thresholds = Thresholds::from_config(handler.config());
        Self {
            handler,
            nlu: None,
            reply_threshold,
            thresholds,
        }
    }

    pub fn with_nlu(mut self, nlu: impl NluBackend + 'static) -> Self {
        self.nlu = Some(Box::new(nlu));
        self
    }

    pub fn handler(&self) -> &ChatHandler {
        &self.handler
    }

    fn ask_nlu(&self, message: &str, user_id: &str) -> Option<RasaReply> {
        let nlu = self.nlu.as_ref()?;
        match nlu.parse(message, user_id) {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!("{} unavailable: {}", nlu.name(), e);
                None
            }
        }
    }

    /// Answer a message from the best available source.
    pub fn route(&self, message: &str, user_id: &str) -> HybridReply {
        if let Some(reply) = self.ask_nlu(message, user_id) {
            if is_good_response(&reply, self.reply_threshold) {
                info!("NLU answered '{}' ({:.2})", reply.intent, reply.confidence);
                let intent = Intent::from_str(&reply.intent).unwrap_or(Intent::General);

                let mut response = ChatResponse::new(ResponseKind::Text, reply.text)
                    .with_method(ReplySource::Rasa.as_str())
                    .with_intent(intent, reply.confidence);
                if !reply.entities.is_empty() {
                    response = response.with_data(Value::Array(reply.entities));
                }

                self.handler.history().record(
                    user_id,
                    message,
                    &response.message,
                    response.kind,
                    intent,
                );
                return HybridReply {
                    source: ReplySource::Rasa,
                    response,
                };
            }
            debug!("NLU reply not good enough, using local handler");
        }

        let response = self.handler.process_message(message, user_id);
        if response.kind != ResponseKind::Error {
            let response = response.with_method(ReplySource::Chatbot.as_str());
            return HybridReply {
                source: ReplySource::Chatbot,
                response,
            };
        }

        warn!("No source could answer message from {}", user_id);
        HybridReply {
            source: ReplySource::Fallback,
            response: ChatResponse::new(ResponseKind::Error, FALLBACK_REPLY)
                .with_method(ReplySource::Fallback.as_str())
                .with_intent(response.intent, FALLBACK_CONFIDENCE),
        }
    }

    /// Compare the local intent detector against the NLU service.
    ///
    /// Without an NLU service the detector's own prediction decides.
    pub fn decide(&self, message: &str, user_id: &str) -> RoutingDecision {
        let (intent, confidence) = self.handler.detector().detect_with_confidence(message);
        let prediction = ClassifierPrediction {
            intent: intent.as_str().to_string(),
            confidence,
            is_invoice_related: is_invoice_related(message),
        };
        let rasa = self.ask_nlu(message, user_id).unwrap_or_default();
        decide_final_response(&prediction, &rasa, &self.thresholds)
    }
}
