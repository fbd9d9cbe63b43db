//! Classifier
//!
//! Turns pending raw jobs into final jobs. A cheap keyword pre-filter runs
//! first; survivors are described to the completion service, whose JSON
//! answer decides acceptance and supplies the normalized attributes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use radar_client::CompletionService;
use radar_core::domain::job::Job;
use radar_core::domain::raw_job::RawJob;
use radar_core::domain::tags::TagMap;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::ProcessorConfig;
use crate::error::ProcessError;

pub const REASON_MISSING_KEYWORDS: &str = "missing required keywords";
pub const REASON_LLM_REJECTED: &str = "llm rejected";

const DEFAULT_PROMPT: &str = "You are a senior recruiter. Read the job posting below and judge it.\n\
{{TEXT}}\n\
Candidate tags: {{TAGS}}. Decide whether the position is remote, summarize it briefly and tag it.";

const ANSWER_INSTRUCTIONS: &str = "\nAnswer with strict JSON only, an object with the fields: \
{\"is_remote\":bool,\"summary\":string,\"verdict\":string,\"employment_type\":string,\
\"salary_range\":string,\"role_category\":string,\"language_requirement\":string,\
\"score\":int,\"tags\":[string],\"skill_tags\":[string]}.";

/// Classification decision for one raw job
#[derive(Debug, Clone)]
pub enum Decision {
    Accepted(Job),
    Rejected { reason: String },
}

/// Decision plus the exchange with the completion service, when one happened
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub decision: Decision,
    pub trace: Option<Value>,
}

impl ProcessOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self.decision, Decision::Accepted(_))
    }
}

/// Classifies raw jobs
#[async_trait]
pub trait JobProcessor: Send + Sync {
    /// Classifies one raw job
    ///
    /// A rejection is an `Ok` outcome; errors mean the job could not be
    /// classified at all.
    async fn process(&self, raw: &RawJob) -> Result<ProcessOutcome, ProcessError>;
}

/// Expected shape of the completion answer
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Classification {
    #[serde(deserialize_with = "null_as_default")]
    is_remote: bool,
    summary: Option<String>,
    verdict: Option<String>,
    employment_type: Option<String>,
    salary_range: Option<String>,
    role_category: Option<String>,
    language_requirement: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    score: i64,
    #[serde(deserialize_with = "null_as_default")]
    tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    skill_tags: Vec<String>,
}

/// Reads an explicit `null` as the zero value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keyword filter plus completion-backed classifier
pub struct Classifier {
    config: ProcessorConfig,
    completion: Arc<dyn CompletionService>,
    /// Lower-cased candidate to canonical spelling
    tag_lookup: HashMap<String, String>,
}

impl Classifier {
    pub fn new(config: ProcessorConfig, completion: Arc<dyn CompletionService>) -> Self {
        let tag_lookup = config
            .tag_candidates
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(|tag| (tag.to_lowercase(), tag.to_string()))
            .collect();

        Self {
            config,
            completion,
            tag_lookup,
        }
    }

    pub fn batch_size(&self) -> i64 {
        self.config.batch_size()
    }

    fn contains_keyword(&self, text: &str) -> bool {
        let mut keywords = self
            .config
            .keywords
            .iter()
            .map(|keyword| keyword.trim())
            .filter(|keyword| !keyword.is_empty())
            .peekable();

        if keywords.peek().is_none() {
            return true;
        }

        let text = text.to_lowercase();
        keywords.any(|keyword| text.contains(&keyword.to_lowercase()))
    }

    fn build_prompt(&self, text: &str) -> String {
        let template = match self.config.prompt_template.trim() {
            "" => DEFAULT_PROMPT,
            custom => custom,
        };

        let mut prompt = template
            .replace("{{TEXT}}", text)
            .replace("{{TAGS}}", &self.config.tag_candidates.join(", "));

        let hints = [
            ("Employment types", &self.config.employment_types),
            ("Salary ranges", &self.config.salary_ranges),
            ("Role categories", &self.config.role_categories),
            ("Language requirements", &self.config.language_options),
        ];
        for (label, options) in hints {
            if !options.is_empty() {
                prompt.push_str(&format!("\n{}: {}", label, options.join(", ")));
            }
        }

        prompt.push_str(ANSWER_INSTRUCTIONS);
        prompt
    }

    fn build_job(&self, raw: &RawJob, answer: Classification) -> Job {
        let id = if raw.external_id.is_empty() {
            format!("{}-{}", raw.source, raw.id)
        } else {
            raw.external_id.clone()
        };

        let summary = answer
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|summary| !summary.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| raw.summary.clone());

        let normalized_tags: TagMap = answer
            .tags
            .iter()
            .filter_map(|tag| self.tag_lookup.get(&tag.trim().to_lowercase()))
            .map(|canonical| (canonical.clone(), Value::Bool(true)))
            .collect();

        let skill_tags: TagMap = answer
            .skill_tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(|tag| (tag.to_string(), Value::Bool(true)))
            .collect();

        let raw_attributes = match &raw.raw_payload {
            Value::Null => json!({}),
            payload => payload.clone(),
        };

        Job {
            id,
            title: raw.title.trim().to_string(),
            summary,
            published_at: raw.published_at,
            source: raw.source.clone(),
            url: raw.url.clone(),
            tags: raw.tags.clone(),
            raw_attributes,
            normalized_tags,
            skill_tags,
            employment_type: answer.employment_type.unwrap_or_default(),
            salary_range: answer.salary_range.unwrap_or_default(),
            role_category: answer.role_category.unwrap_or_default(),
            language_requirement: answer.language_requirement.unwrap_or_default(),
            score: answer.score.clamp(0, 5) as i32,
            verdict: answer.verdict.unwrap_or_default(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[async_trait]
impl JobProcessor for Classifier {
    async fn process(&self, raw: &RawJob) -> Result<ProcessOutcome, ProcessError> {
        let text = format!("{}\n{}\n{}", raw.title, raw.summary, raw.content);
        let text = text.trim();

        if !self.contains_keyword(text) {
            debug!("Raw job {} has none of the required keywords", raw.id);
            return Ok(ProcessOutcome {
                decision: Decision::Rejected {
                    reason: REASON_MISSING_KEYWORDS.to_string(),
                },
                trace: None,
            });
        }

        let prompt = self.build_prompt(text);
        let response = self.completion.complete(&prompt).await?;
        let trace = json!({ "prompt": prompt, "llm_response": response });

        let answer: Classification = serde_json::from_str(response.trim())?;

        if !answer.is_remote {
            let reason = answer
                .verdict
                .as_deref()
                .map(str::trim)
                .filter(|verdict| !verdict.is_empty())
                .unwrap_or(REASON_LLM_REJECTED)
                .to_string();
            debug!("Raw job {} rejected: {}", raw.id, reason);
            return Ok(ProcessOutcome {
                decision: Decision::Rejected { reason },
                trace: Some(trace),
            });
        }

        Ok(ProcessOutcome {
            decision: Decision::Accepted(self.build_job(raw, answer)),
            trace: Some(trace),
        })
    }
}
