use crate::context::FinancialContext;
use crate::error::Result;
use crate::llm::prompts::{build_insight_prompt, build_question_prompt};
use log::{info, warn};

pub const UNCONFIGURED_MESSAGE: &str =
    "AI assistant is not configured. Set GEMINI_API_KEY to enable executive summaries.";
pub const EMPTY_QUESTION_MESSAGE: &str = "Please enter a question.";

/// A text-completion backend. Implementations see nothing but the prompt.
#[allow(async_fn_in_trait)]
pub trait CompletionService {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Narrates a forecast through a completion backend.
///
/// Every method returns display text; backend failures are turned into an
/// explanatory message instead of an error so the numeric results stay usable.
pub struct CfoAssistant<C> {
    service: Option<C>,
}

impl<C: CompletionService> CfoAssistant<C> {
    pub fn new(service: C) -> Self {
        Self {
            service: Some(service),
        }
    }

    pub fn unconfigured() -> Self {
        Self { service: None }
    }

    pub fn is_configured(&self) -> bool {
        self.service.is_some()
    }

    pub async fn executive_summary(&self, context: &FinancialContext) -> String {
        let Some(service) = &self.service else {
            return UNCONFIGURED_MESSAGE.to_string();
        };

        info!("Requesting CFO executive summary");
        match service.complete(&build_insight_prompt(context)).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Executive summary failed: {}", e);
                format!("AI Error: {}\n\nPlease check your API key and try again.", e)
            }
        }
    }

    pub async fn ask(&self, question: &str, context: &FinancialContext) -> String {
        if question.trim().is_empty() {
            return EMPTY_QUESTION_MESSAGE.to_string();
        }
        let Some(service) = &self.service else {
            return UNCONFIGURED_MESSAGE.to_string();
        };

        match service
            .complete(&build_question_prompt(context, question))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("CFO question failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::build_context;
    use crate::engine::{ForecastEngine, WeeklyTotals};
    use crate::error::ForecastError;
    use crate::kpi::compute_kpis;
    use crate::utils::week_period_for;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingService {
        prompts: Mutex<Vec<String>>,
    }

    impl CompletionService for RecordingService {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("Liquidity is healthy.".to_string())
        }
    }

    struct FailingService;

    impl CompletionService for FailingService {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(ForecastError::AuthError("API key rejected".to_string()))
        }
    }

    fn context() -> FinancialContext {
        let totals = vec![WeeklyTotals {
            period: week_period_for(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()),
            inflow_total: dec!(10000),
            outflow_total: dec!(300000),
        }];
        let series = ForecastEngine::new(dec!(250000)).project(&totals);
        let kpis = compute_kpis(&series, dec!(50000), dec!(30000), &[]).unwrap();
        build_context(&series, &kpis, &[], dec!(20))
    }

    #[tokio::test]
    async fn test_summary_prompt_carries_only_the_context() {
        let service = RecordingService::default();
        let assistant = CfoAssistant::new(service);
        let ctx = context();

        let summary = assistant.executive_summary(&ctx).await;
        assert_eq!(summary, "Liquidity is healthy.");

        let prompts = assistant.service.as_ref().unwrap().prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(ctx.as_str()));
    }

    #[tokio::test]
    async fn test_failures_become_messages() {
        let assistant = CfoAssistant::new(FailingService);
        let ctx = context();

        let summary = assistant.executive_summary(&ctx).await;
        assert!(summary.starts_with("AI Error: "));
        assert!(summary.contains("API key rejected"));

        let answer = assistant.ask("When is cash lowest?", &ctx).await;
        assert!(answer.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_blank_question_and_missing_backend() {
        let assistant = CfoAssistant::new(RecordingService::default());
        assert_eq!(assistant.ask("   ", &context()).await, EMPTY_QUESTION_MESSAGE);
        assert!(assistant.service.as_ref().unwrap().prompts.lock().unwrap().is_empty());

        let offline = CfoAssistant::<RecordingService>::unconfigured();
        assert!(!offline.is_configured());
        assert_eq!(offline.executive_summary(&context()).await, UNCONFIGURED_MESSAGE);
    }
}
