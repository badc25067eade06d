use crate::infra::{parse_date, start_of_day, InMemoryDirectory, Services};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use wvpp_compliance::compliance::ComplianceScore;
use wvpp_compliance::config::ReminderConfig;
use wvpp_compliance::error::AppError;
use wvpp_compliance::organization::{EmployeeId, OrganizationId};
use wvpp_compliance::reminders::{DeliveryStatus, ReminderTickReport};
use wvpp_compliance::training::{
    ModuleCatalog, ModuleCatalogEntry, SubmittedAnswer, TrainingQuestion, TrainingServiceError,
    VideoProgressReport,
};

const DEMO_EMPLOYEE: &str = "ana-ruiz";
const DEMO_ORGANIZATION: &str = "harbor-clinic";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation date for reminders and scoring (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let services = Services::in_memory(&ReminderConfig::default(), InMemoryDirectory::sample(today));
    let employee_id = EmployeeId(DEMO_EMPLOYEE.to_string());
    let mut clock = start_of_day(today) + Duration::hours(9);

    println!("WVPP training compliance demo ({today})");

    let assigned = services
        .tracker
        .assign_training(&employee_id, Some(today + Duration::days(30)), clock)?;
    println!(
        "\nAssigned {} required module(s) to {DEMO_EMPLOYEE}, due {}",
        assigned.len(),
        today + Duration::days(30)
    );
    render_catalog(&services.tracker.catalog_for(&employee_id)?);

    for entry in services.tracker.catalog_for(&employee_id)? {
        let module_id = entry.module.id.clone();
        let questions = services
            .catalog
            .questions(&module_id)
            .map_err(TrainingServiceError::from)?;
        println!(
            "\n{} ({} min video; quiz: {})",
            entry.module.title,
            entry.module.video_duration_minutes,
            question_mix(&questions)
        );

        clock += Duration::minutes(i64::from(entry.module.video_duration_minutes));
        services.tracker.ensure_unlocked(&employee_id, &module_id)?;
        let update = services.tracker.report_video_progress(
            &employee_id,
            &module_id,
            VideoProgressReport {
                video_progress: 100.0,
                last_watched_position: f64::from(entry.module.video_duration_minutes) * 60.0,
            },
            clock,
        )?;
        println!(
            "- video {}% watched | status {}",
            update.progress.video_progress,
            update.progress.status.label()
        );

        if entry.module.order == 1 {
            clock += Duration::minutes(5);
            let miss = services.tracker.submit_quiz(
                &employee_id,
                &module_id,
                &last_option_answers(&questions),
                clock,
            )?;
            println!(
                "- attempt {}: {}% ({}) | {} attempt(s) left",
                miss.attempt_number,
                miss.score,
                pass_label(miss.passed),
                miss.attempts_remaining
                    .map(|left| left.to_string())
                    .unwrap_or_else(|| "unlimited".to_string())
            );
        }

        clock += Duration::minutes(5);
        let outcome = services.tracker.submit_quiz(
            &employee_id,
            &module_id,
            &correct_answers(&questions),
            clock,
        )?;
        println!(
            "- attempt {}: {}% ({}) | best {}% | module completed: {}",
            outcome.attempt_number,
            outcome.score,
            pass_label(outcome.passed),
            outcome.best_score,
            outcome.module_completed
        );

        if let Some(curriculum) = outcome.curriculum {
            println!(
                "\nCurriculum complete ({:?}); next training due {}; record issued: {}",
                curriculum.kind, curriculum.next_training_due_date, curriculum.record_issued
            );
        }
    }

    for record in services.records.records() {
        println!(
            "Training record for {}: {} module(s), next due {}",
            record.employee_name,
            record.modules.len(),
            record.next_due_date
        );
    }

    let report = services.reminders.dispatcher().run_tick(today)?;
    render_tick(&report);
    println!("{} notification(s) queued in the outbox", services.notifier.outbox().len());

    let score = services
        .compliance
        .compute_compliance_score(&OrganizationId(DEMO_ORGANIZATION.to_string()), today)?;
    render_score(&score);

    Ok(())
}

fn correct_answers(questions: &[TrainingQuestion]) -> Vec<SubmittedAnswer> {
    questions
        .iter()
        .map(|question| SubmittedAnswer {
            question_id: question.id.clone(),
            selected_option_ids: question.correct_options().into_iter().cloned().collect(),
        })
        .collect()
}

fn last_option_answers(questions: &[TrainingQuestion]) -> Vec<SubmittedAnswer> {
    questions
        .iter()
        .map(|question| SubmittedAnswer {
            question_id: question.id.clone(),
            selected_option_ids: question
                .options
                .last()
                .map(|option| vec![option.id.clone()])
                .unwrap_or_default(),
        })
        .collect()
}

/// "2 multiple_choice, 1 true_false" in first-seen order.
fn question_mix(questions: &[TrainingQuestion]) -> String {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();
    for question in questions {
        let label = question.question_type.label();
        match counts.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }
    counts
        .iter()
        .map(|(label, count)| format!("{count} {label}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn pass_label(passed: bool) -> &'static str {
    if passed {
        "passed"
    } else {
        "failed"
    }
}

fn render_catalog(entries: &[ModuleCatalogEntry]) {
    for entry in entries {
        println!(
            "  {}. {} [{}{}]",
            entry.module.order,
            entry.module.title,
            entry.status_label,
            if entry.locked { ", locked" } else { "" }
        );
    }
}

fn render_tick(report: &ReminderTickReport) {
    println!(
        "\nReminder tick: {} sent | {} failed | {} skipped across {} organization(s)",
        report.sent, report.errors, report.skipped, report.organizations_scanned
    );
    for detail in &report.details {
        let status = match detail.status {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Skipped => "skipped",
        };
        println!(
            "  - {} -> {} ({status})",
            detail
                .reminder
                .map(|kind| kind.template())
                .unwrap_or("lookup"),
            detail.recipient.as_deref().unwrap_or(&detail.target)
        );
    }
}

fn render_score(score: &ComplianceScore) {
    println!("\nCompliance score for {}: {}/100", score.organization_id, score.overall);
    println!(
        "  plan {} | training {} | review {} | incidents {}",
        score.pillars.plan, score.pillars.training, score.pillars.review, score.pillars.incident
    );
    if !score.alerts.is_empty() {
        println!("Alerts:");
        for alert in &score.alerts {
            println!("  - [{:?}] {}", alert.severity, alert.message);
        }
    }
    if !score.deadlines.is_empty() {
        println!("Deadlines:");
        for deadline in &score.deadlines {
            println!(
                "  - {} on {} ({} day(s))",
                deadline.label, deadline.due_date, deadline.days_remaining
            );
        }
    }
}
