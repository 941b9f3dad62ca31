//! SAGE Router - component 4.G: Intent Router.
//!
//! Rule layer as deterministic pure functions over lowercased text; LLM
//! layer delegates to `sage_llm::LLMRouter`, asking for a single JSON object
//! and validating the domain enum, per spec.md §4.G's three-step decision
//! procedure.

mod domain;
mod llm;
mod rules;

pub use domain::{Domain, Lang, RouteResult};
pub use rules::{is_medical_action_intent, is_payment_action_intent, is_planning_action_intent, rule_layer};

use tokio_util::sync::CancellationToken;

use sage_types::stage::Stage;

/// How much the LLM layer is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterMode {
    /// Rule layer only; an empty rule match falls back to chat.
    Rules,
    /// Ask the LLM only when the rule layer returns nothing.
    Hybrid,
    /// Always ask the LLM; the rule layer is only a fallback if the LLM
    /// call itself fails.
    Llm,
}

impl RouterMode {
    /// Reads `ROOT_INTENT_MODE` (spec.md §6), one of `rules`/`hybrid`/`llm`.
    pub fn from_env() -> Self {
        match std::env::var("ROOT_INTENT_MODE").ok().as_deref() {
            Some("rules") => Self::Rules,
            Some("llm") => Self::Llm,
            _ => Self::Hybrid,
        }
    }
}

pub struct IntentRouter {
    llm: Option<sage_llm::LLMRouter>,
    mode: RouterMode,
}

impl IntentRouter {
    pub fn new(mode: RouterMode, llm: Option<sage_llm::LLMRouter>) -> Self {
        Self { mode, llm }
    }

    pub fn from_env() -> Self {
        let mode = RouterMode::from_env();
        let llm = if mode == RouterMode::Rules { None } else { Some(sage_llm::LLMRouter::from_env()) };
        Self::new(mode, llm)
    }

    /// Resolve the language for this turn: header > message metadata > the
    /// LLM's own classification (if it ran) > heuristic detection.
    fn resolve_lang(lang_header: Option<&str>, metadata_lang: Option<&str>, llm_lang: Option<Lang>, text: &str) -> Lang {
        if let Some(lang) = lang_header.and_then(Lang::parse) {
            return lang;
        }
        if let Some(lang) = metadata_lang.and_then(Lang::parse) {
            return lang;
        }
        if let Some(lang) = llm_lang {
            return lang;
        }
        Lang::detect(text)
    }

    /// Run the three-step decision procedure of spec.md §4.G.
    pub async fn route(&self, text: &str, stage: Stage, payment_slots_non_empty: bool, lang_header: Option<&str>, metadata_lang: Option<&str>, cancel: &CancellationToken) -> RouteResult {
        let lower_text = text.to_lowercase();
        let rule_domain = rule_layer(&lower_text);

        // Step 1: sticky payment. Only a strong medical/planning signal can
        // break a conversation already mid-collection out of payment.
        if payment_slots_non_empty || stage.is_sticky() {
            if !matches!(rule_domain, Some(Domain::Medical) | Some(Domain::Planning)) {
                let lang = Self::resolve_lang(lang_header, metadata_lang, None, text);
                return RouteResult { domain: Domain::Payment, lang };
            }
        }

        // Step 2 / 3.
        match self.mode {
            RouterMode::Rules => {
                let domain = rule_domain.unwrap_or(Domain::Chat);
                let lang = Self::resolve_lang(lang_header, metadata_lang, None, text);
                RouteResult { domain, lang }
            }
            RouterMode::Hybrid => {
                if let Some(domain) = rule_domain {
                    let lang = Self::resolve_lang(lang_header, metadata_lang, None, text);
                    return RouteResult { domain, lang };
                }
                self.ask_llm_or_chat(text, lang_header, metadata_lang, cancel).await
            }
            RouterMode::Llm => {
                if let Some(router) = &self.llm {
                    if let Some((domain, llm_lang)) = llm::classify(router, cancel, text).await {
                        let lang = Self::resolve_lang(lang_header, metadata_lang, Some(llm_lang), text);
                        return RouteResult { domain, lang };
                    }
                }
                let domain = rule_domain.unwrap_or(Domain::Chat);
                let lang = Self::resolve_lang(lang_header, metadata_lang, None, text);
                RouteResult { domain, lang }
            }
        }
    }

    async fn ask_llm_or_chat(&self, text: &str, lang_header: Option<&str>, metadata_lang: Option<&str>, cancel: &CancellationToken) -> RouteResult {
        if let Some(router) = &self.llm {
            if let Some((domain, llm_lang)) = llm::classify(router, cancel, text).await {
                let lang = Self::resolve_lang(lang_header, metadata_lang, Some(llm_lang), text);
                return RouteResult { domain, lang };
            }
        }
        let lang = Self::resolve_lang(lang_header, metadata_lang, None, text);
        RouteResult { domain: Domain::Chat, lang }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sticky_payment_keeps_routing_payment_on_plain_text() {
        let router = IntentRouter::new(RouterMode::Rules, None);
        let cancel = CancellationToken::new();
        let result = router.route("네 맞아요", Stage::Collect, false, None, None, &cancel).await;
        assert_eq!(result.domain, Domain::Payment);
    }

    #[tokio::test]
    async fn strong_medical_signal_breaks_sticky_payment() {
        let router = IntentRouter::new(RouterMode::Rules, None);
        let cancel = CancellationToken::new();
        let result = router.route("두통이 너무 심해요", Stage::Collect, true, None, None, &cancel).await;
        assert_eq!(result.domain, Domain::Medical);
    }

    #[tokio::test]
    async fn rules_mode_falls_back_to_chat_with_no_llm() {
        let router = IntentRouter::new(RouterMode::Rules, None);
        let cancel = CancellationToken::new();
        let result = router.route("안녕하세요", Stage::Idle, false, None, None, &cancel).await;
        assert_eq!(result.domain, Domain::Chat);
    }

    #[tokio::test]
    async fn lang_header_wins_over_detection() {
        let router = IntentRouter::new(RouterMode::Rules, None);
        let cancel = CancellationToken::new();
        let result = router.route("hello there", Stage::Idle, false, Some("ko"), None, &cancel).await;
        assert_eq!(result.lang, Lang::Ko);
    }
}
