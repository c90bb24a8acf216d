//! Invoice assistant chat: intent detection, replies and routing.

pub mod handler;
pub mod history;
pub mod hybrid;
pub mod intent;
mod replies;

pub use handler::{ChatHandler, ChatResponse, Responder, ResponseKind};
pub use history::{ConversationContext, ConversationStats, ConversationStore, Exchange};
pub use hybrid::{
    decide_final_response, is_good_response, ClassifierPrediction, DecisionSource, HybridReply,
    HybridRouter, NluBackend, RasaReply, ReplySource, RoutingDecision, Thresholds,
};
pub use intent::{is_invoice_related, Intent, IntentDetector};
