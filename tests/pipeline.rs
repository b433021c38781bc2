//! End-to-end pipeline runs against throwaway directories and a scripted
//! analysis gateway.

use std::path::{Path, PathBuf};

use know_pipe::assembler::GenerationStamp;
use know_pipe::config::Config;
use know_pipe::gateway::ScriptedGateway;
use know_pipe::models::{GuideKind, MediaKind};
use know_pipe::pipeline::{run_auto, run_manifest, PipelineError, RunContext};
use know_pipe::progress::NoProgress;

const CHARGE_ANALYSIS: &str = "Pattern Name: Idempotent Charge\n\n\
What it does: dedupes charges by idempotency key before calling the processor\n\n\
Code example:\n```\ncharge(key, amount)\n```\n";

const REFUND_ANALYSIS: &str = "Pattern Name: Refund Ledger Entry\n\n\
What it does: records every refund as a compensating ledger row\n";

const ARCH_ANALYSIS: &str = "# Payment Platform\n\n\
Architectural Insights\n- Payment ledger is append-only\n\n\
Common Gotchas\n- Currency rounding differs per processor\n";

const LOG_ANALYSIS: &str = "Pitfalls:\n- Retry storms when the processor times out\n";

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// A small project with payment code, an email module whose analysis
/// yields nothing, one undersized file, an architecture doc and a log.
fn project(root: &Path) -> PathBuf {
    let src = root.join("src");
    write(
        &src.join("payments/charge.py"),
        &"def charge(key, amount):\n    return processor.charge(key=key, amount=amount)\n".repeat(4),
    );
    write(
        &src.join("payments/refund.py"),
        &"def refund(charge_id):\n    ledger.append(compensating_row(charge_id))\n".repeat(4),
    );
    write(
        &src.join("email/sender.py"),
        &"def send_mail(to, body):\n    smtp.send(to=to, body=body)\n".repeat(4),
    );
    write(&src.join("tiny/empty.py"), "x = 1\n");

    let docs = root.join("docs");
    write(
        &docs.join("ARCHITECTURE.md"),
        &"The platform keeps an append-only ledger of every charge and refund.\n".repeat(3),
    );

    let logs = root.join("logs");
    write(
        &logs.join("app.log"),
        &"2024-01-01 ERROR processor timeout, retrying charge\n".repeat(10),
    );

    let manifest = root.join("intake/SOURCE_ANALYSIS.md");
    write(
        &manifest,
        &format!(
            "# Source Analysis\n\n\
             ## PRIMARY SOURCE CODE\n- Application: {}\n\n\
             ## DOCUMENTATION SOURCES\n- {}\n\n\
             ## EXECUTION DATA\n- Logs: {}\n- {}/placeholder/missing\n",
            src.display(),
            docs.display(),
            logs.display(),
            root.display()
        ),
    );
    manifest
}

fn gateway() -> ScriptedGateway {
    ScriptedGateway::new("")
        .respond_when("def charge", CHARGE_ANALYSIS)
        .respond_when("def refund", REFUND_ANALYSIS)
        .respond_when("def send_mail", "Nothing reusable here.")
        .respond_when("append-only ledger", ARCH_ANALYSIS)
        .respond_when("processor timeout", LOG_ANALYSIS)
}

fn config_for(root: &Path) -> Config {
    let mut config = Config::minimal();
    config.output.root = root.join("knowledge_library");
    config
}

#[tokio::test]
async fn manifest_run_writes_linked_library() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = project(dir.path());
    let config = config_for(dir.path());
    let gateway = gateway();
    let ctx = RunContext::new(&config, &gateway, &NoProgress);

    let report = run_manifest(&manifest, &ctx, &GenerationStamp::fixed("2024-05-01"))
        .await
        .unwrap();

    let howto = report.guides_of(GuideKind::HowToBuild);
    assert_eq!(howto.len(), 1);
    assert_eq!(howto[0].filename, "how_to_build_payment_processing.md");

    // email and tiny produced no patterns, so their groups are gone too.
    let features: Vec<&String> = report.knowledge.code.groups.keys().collect();
    assert_eq!(features, ["payment_processing"]);
    assert!(!report.knowledge.code.patterns.contains_key("email_system"));
    assert!(!report.knowledge.code.patterns.contains_key("tiny"));

    assert_eq!(report.guides_of(GuideKind::Pattern).len(), 2);
    assert_eq!(report.guides_of(GuideKind::Architecture).len(), 1);
    assert_eq!(report.guides_of(GuideKind::Pitfalls).len(), 1);
    assert_eq!(report.written.len(), report.guides.len());

    let library = &config.output.root;
    let body = std::fs::read_to_string(library.join("how_to_build/how_to_build_payment_processing.md")).unwrap();
    assert!(body.contains("idempotent_charge.md"));
    assert!(body.contains("Payment ledger is append-only"));
    assert!(body.contains("../gotchas/common_pitfalls.md"));
    assert!(body.contains("*Generated on: 2024-05-01*"));

    let pitfalls = std::fs::read_to_string(library.join("gotchas/common_pitfalls.md")).unwrap();
    assert!(pitfalls.contains("Retry storms when the processor times out"));
    assert!(pitfalls.contains("Currency rounding differs per processor"));

    assert_eq!(report.knowledge.media[&MediaKind::Logs].len(), 1);
}

#[tokio::test]
async fn rerun_is_stable_apart_from_the_date() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = project(dir.path());
    let config = config_for(dir.path());
    let gateway = gateway();
    let ctx = RunContext::new(&config, &gateway, &NoProgress);

    let first = run_manifest(&manifest, &ctx, &GenerationStamp::fixed("2024-05-01"))
        .await
        .unwrap();
    let bytes_first: Vec<Vec<u8>> = first.written.iter().map(|p| std::fs::read(p).unwrap()).collect();

    let same_day = run_manifest(&manifest, &ctx, &GenerationStamp::fixed("2024-05-01"))
        .await
        .unwrap();
    let bytes_again: Vec<Vec<u8>> = same_day.written.iter().map(|p| std::fs::read(p).unwrap()).collect();
    assert_eq!(first.written, same_day.written);
    assert_eq!(bytes_first, bytes_again);

    let next_day = run_manifest(&manifest, &ctx, &GenerationStamp::fixed("2024-05-02"))
        .await
        .unwrap();
    for (a, b) in first.guides.iter().zip(&next_day.guides) {
        assert_eq!(a.filename, b.filename);
        assert_eq!(a.content_digest(), b.content_digest());
    }
}

#[tokio::test]
async fn unavailable_gateway_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = project(dir.path());
    let config = config_for(dir.path());
    let gateway = ScriptedGateway::unavailable();
    let ctx = RunContext::new(&config, &gateway, &NoProgress);

    let err = run_manifest(&manifest, &ctx, &GenerationStamp::fixed("2024-05-01"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoAnalysisProvider(_))
    ));
    assert!(gateway.calls().is_empty());
    assert!(!config.output.root.exists());
}

const DATA_ANALYSIS: &str = "**Data Structure Patterns**: every endpoint entry carries method, path and a response schema\n\
- Example: {\"method\": \"GET\", \"path\": \"/v1/charges\"} repeats across files";

#[tokio::test]
async fn auto_mode_writes_manifest_and_api_guides() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    write(
        &data.join("billing.json"),
        r#"{"endpoints": [{"method": "GET", "path": "/v1/charges"}, {"method": "POST", "path": "/v1/refunds"}]}"#,
    );
    write(
        &data.join("overview.md"),
        &"Billing endpoints are versioned under /v1 and return JSON.\n".repeat(3),
    );

    let config = config_for(dir.path());
    let gateway = ScriptedGateway::new(DATA_ANALYSIS);
    let ctx = RunContext::new(&config, &gateway, &NoProgress);
    let manifest_out = dir.path().join("intake/auto_generated_analysis.md");

    let report = run_auto(
        &data,
        "billing integration guides",
        &manifest_out,
        &ctx,
        &GenerationStamp::fixed("2024-05-01"),
    )
    .await
    .unwrap();

    let manifest = std::fs::read_to_string(&manifest_out).unwrap();
    assert!(manifest.starts_with("<!--\nAuto-generated SOURCE_ANALYSIS.md\n"));
    assert!(manifest.contains("Use case: billing integration guides..."));
    assert_eq!(report.manifest_path.as_deref(), Some(manifest_out.as_path()));

    let howto = report.guides_of(GuideKind::HowToBuild);
    assert_eq!(howto.len(), 1);
    assert_eq!(howto[0].filename, "how_to_build_api_documentation.md");
    assert_eq!(report.guides_of(GuideKind::Pattern).len(), 1);
    assert!(report.knowledge.media.is_empty());
    assert!(config.output.root.join("how_to_build/how_to_build_api_documentation.md").is_file());
}

#[tokio::test]
async fn auto_mode_without_patterns_fails() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    write(&data.join("readme.md"), "# Data\n");

    let config = config_for(dir.path());
    let gateway = ScriptedGateway::new("");
    let ctx = RunContext::new(&config, &gateway, &NoProgress);
    let manifest_out = dir.path().join("intake/auto.md");

    let err = run_auto(&data, "", &manifest_out, &ctx, &GenerationStamp::fixed("2024-05-01"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoPatterns(_))
    ));
    assert!(!manifest_out.exists());
}
