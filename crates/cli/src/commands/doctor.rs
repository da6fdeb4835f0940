//! Doctor command - validate configuration and show status

use anyhow::Result;
use quizcast_adapters::store::SqliteContentStore;
use quizcast_adapters::telegram::parse_channel;
use quizcast_domain::ContentStore;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    store: CheckResult,
    llm: CheckResult,
    telegram: CheckResult,
    schedule: CheckResult,
    curriculum: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self::with_status("ok", message)
    }

    fn warn(message: impl Into<String>) -> Self {
        Self::with_status("warn", message)
    }

    fn error(message: impl Into<String>) -> Self {
        Self::with_status("error", message)
    }

    fn skipped() -> Self {
        Self::with_status("skipped", "Not requested")
    }

    fn with_status(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }

    fn is_warn(&self) -> bool {
        self.status == "warn"
    }
}

const COMPONENTS: [&str; 5] = ["store", "llm", "telegram", "schedule", "curriculum"];

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    if let Some(check) = args.check.as_deref() {
        if check != "config" && !COMPONENTS.contains(&check) {
            anyhow::bail!(
                "Unknown component '{}', expected config or one of: {}",
                check,
                COMPONENTS.join(", ")
            );
        }
    }
    let wanted = |name: &str| args.check.as_deref().is_none_or(|c| c == name);

    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        store: CheckResult::skipped(),
        llm: CheckResult::skipped(),
        telegram: CheckResult::skipped(),
        schedule: CheckResult::skipped(),
        curriculum: CheckResult::skipped(),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        if wanted("store") {
            report.store = check_store(config).await;
        }
        if wanted("llm") {
            report.llm = check_llm(config);
        }
        if wanted("telegram") {
            report.telegram = check_telegram(config);
        }
        if wanted("schedule") {
            report.schedule = check_schedule(config);
        }
        if wanted("curriculum") {
            report.curriculum = check_curriculum(config);
        }
    }

    let checks = [
        &report.config,
        &report.store,
        &report.llm,
        &report.telegram,
        &report.schedule,
        &report.curriculum,
    ];

    report.overall = if checks.iter().any(|c| c.is_error()) {
        "error".to_string()
    } else if checks.iter().any(|c| c.is_warn()) {
        "warn".to_string()
    } else {
        "ok".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_store(config: &AppConfig) -> CheckResult {
    let path = &config.general.state_db_path;
    let store = match SqliteContentStore::new(path).await {
        Ok(store) => store,
        Err(e) => {
            return CheckResult::error(format!(
                "Cannot open state database {}: {}",
                path.display(),
                e
            ));
        }
    };

    let cursor = match store.topic_cursor().await {
        Ok(cursor) => cursor,
        Err(e) => return CheckResult::error(format!("Cannot read topic cursor: {}", e)),
    };

    match store.list_drafts().await {
        Ok(drafts) => CheckResult::ok(format!(
            "{} (cursor {}, {} drafts pending)",
            path.display(),
            cursor,
            drafts.len()
        ))
        .with_details(serde_json::json!({
            "cursor": cursor,
            "drafts": drafts.iter().map(|d| d.category).collect::<Vec<_>>(),
        })),
        Err(e) => CheckResult::error(format!("Cannot read drafts: {}", e)),
    }
}

fn check_llm(config: &AppConfig) -> CheckResult {
    let provider = &config.llm.provider;
    let model = &config.llm.model;

    let api_key_env = match provider.as_str() {
        "gemini" => &config.llm.gemini.api_key_env,
        "stub" => return CheckResult::warn("Provider: stub (offline, canned content)"),
        other => return CheckResult::error(format!("Unknown provider: {}", other)),
    };

    if api_key_env.is_empty() {
        return CheckResult::error(format!("No API key env var configured for {}", provider));
    }

    // Report presence without revealing the value
    match std::env::var(api_key_env) {
        Ok(val) if !val.trim().is_empty() => CheckResult::ok(format!(
            "Provider: {}, Model: {}, API key: {} (set)",
            provider, model, api_key_env
        )),
        _ => CheckResult::error(format!(
            "Provider: {}, Model: {}, API key: {} (not set)",
            provider, model, api_key_env
        )),
    }
}

fn check_telegram(config: &AppConfig) -> CheckResult {
    let telegram = &config.telegram;

    if let Err(e) = config.operator() {
        return CheckResult::error(e.to_string());
    }

    let channel = match config.channel() {
        Ok(channel) => channel,
        Err(e) => return CheckResult::error(e.to_string()),
    };
    if let Err(e) = parse_channel(channel) {
        return CheckResult::error(e.to_string());
    }

    let token_set = std::env::var(&telegram.bot_token_env)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);

    let summary = format!(
        "Channel: {}, Operator: {}, Bot token: {} ({})",
        telegram.channel,
        telegram.operator_id,
        telegram.bot_token_env,
        if token_set { "set" } else { "not set" }
    );

    if token_set {
        CheckResult::ok(summary)
    } else if config.general.dry_run {
        CheckResult::warn(summary)
    } else {
        CheckResult::error(summary)
    }
}

fn check_schedule(config: &AppConfig) -> CheckResult {
    match config.schedule() {
        Ok(schedule) => {
            let slots: Vec<_> = schedule
                .entries()
                .iter()
                .map(|e| format!("{} {} {}", e.at, e.category, e.kind.as_str()))
                .collect();
            let result = if config.schedule.enabled {
                CheckResult::ok(format!(
                    "{} jobs a day at UTC{}",
                    slots.len(),
                    schedule.offset()
                ))
            } else {
                CheckResult::warn("Schedule disabled; drafts only on operator request")
            };
            result.with_details(serde_json::json!({ "jobs": slots }))
        }
        Err(e) => CheckResult::error(format!("{:#}", e)),
    }
}

fn check_curriculum(config: &AppConfig) -> CheckResult {
    match config.curriculum() {
        Ok(curriculum) if curriculum.is_empty() => {
            CheckResult::error("No topics configured; linked categories cannot draft")
        }
        Ok(curriculum) => CheckResult::ok(format!(
            "{} topics, linked: {}",
            curriculum.len(),
            curriculum
                .linked_categories()
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )),
        Err(e) => CheckResult::error(e.to_string()),
    }
}

fn print_report(report: &DoctorReport) {
    println!("quizcast Doctor Report");
    println!("======================");
    println!();

    print_check("Config", &report.config);
    print_check("Store", &report.store);
    print_check("LLM Provider", &report.llm);
    print_check("Telegram", &report.telegram);
    print_check("Schedule", &report.schedule);
    print_check("Curriculum", &report.curriculum);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: quizcast run --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        "skipped" => "-",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_schedule_reports_bad_slot() {
        let mut config = AppConfig::default();
        config.schedule.quiz.prepare = "19:00".to_string();

        let result = check_schedule(&config);
        assert!(result.is_error());
        assert!(result.message.contains("quiz"));
    }

    #[test]
    fn test_check_telegram_requires_operator() {
        let config = AppConfig::default();
        let result = check_telegram(&config);
        assert!(result.is_error());
        assert!(result.message.contains("operator_id"));
    }

    #[test]
    fn test_check_telegram_requires_channel() {
        let mut config = AppConfig::default();
        config.telegram.operator_id = 4242;
        let result = check_telegram(&config);
        assert!(result.is_error());
        assert_eq!(result.message, "telegram.channel is not set");
    }

    #[test]
    fn test_check_curriculum_reports_unlinked_topic_template() {
        let mut config = AppConfig::default();
        config.curriculum.linked_categories = vec!["noon".to_string()];
        let result = check_curriculum(&config);
        assert!(result.is_error());
        assert!(result.message.contains("prompts.quiz"), "{}", result.message);
    }

    #[test]
    fn test_check_curriculum_empty() {
        let mut config = AppConfig::default();
        config.curriculum.topics.clear();
        assert!(check_curriculum(&config).is_error());
    }

    #[test]
    fn test_check_llm_stub_warns() {
        let mut config = AppConfig::default();
        config.llm.provider = "stub".to_string();
        assert!(check_llm(&config).is_warn());
    }
}
