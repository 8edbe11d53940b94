use clap::{Args, Subcommand};

use attest_app::{
    context::AppContext,
    domain::{
        certificates::models::IssuanceMode,
        events::models::{EventUuid, Participant},
        identities::models::UserUuid,
        quizzes::models::QuizUuid,
    },
};

#[derive(Debug, Args)]
pub(crate) struct CertificatesCommand {
    #[command(subcommand)]
    command: CertificatesSubcommand,
}

#[derive(Debug, Subcommand)]
enum CertificatesSubcommand {
    /// Issue certificates to an event's participants after it has ended
    IssueEvent(IssueEventArgs),

    /// Issue a skill certificate for a quiz attempt
    IssueQuiz(IssueQuizArgs),

    /// Look up a certificate and its ledger status
    Verify(VerifyArgs),

    /// Revoke a certificate on the ledger
    Revoke(RevokeArgs),
}

#[derive(Debug, Args)]
struct IssueEventArgs {
    #[arg(long)]
    event: EventUuid,

    /// Who to issue to (all, attended-only)
    #[arg(long, default_value = "all")]
    mode: IssuanceMode,

    #[arg(long)]
    issued_by: Option<UserUuid>,
}

#[derive(Debug, Args)]
struct IssueQuizArgs {
    #[arg(long)]
    quiz: QuizUuid,

    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,

    /// Number of correctly answered questions
    #[arg(long)]
    correct: u32,

    #[arg(long)]
    issued_by: Option<UserUuid>,
}

#[derive(Debug, Args)]
struct VerifyArgs {
    /// Public certificate id, e.g. CERT-9F1C04A2B37DE580
    #[arg(long)]
    id: String,
}

#[derive(Debug, Args)]
struct RevokeArgs {
    #[arg(long)]
    id: String,

    #[arg(long)]
    reason: String,

    #[arg(long)]
    actor: Option<UserUuid>,
}

pub(crate) async fn run(context: &AppContext, command: CertificatesCommand) -> Result<(), String> {
    match command.command {
        CertificatesSubcommand::IssueEvent(args) => {
            let report = context
                .certificates
                .issue_for_event(args.event, args.mode, args.issued_by)
                .await
                .map_err(|error| format!("failed to issue certificates: {error}"))?;

            println!("issued: {}", report.issued);
            println!("skipped: {}", report.skipped);

            for failure in report.errors {
                println!("  {} <{}>: {}", failure.name, failure.email, failure.error);
            }

            Ok(())
        }
        CertificatesSubcommand::IssueQuiz(args) => {
            let quiz = context
                .quizzes
                .get_quiz(args.quiz)
                .await
                .map_err(|error| format!("failed to load quiz: {error}"))?;

            let certificate = context
                .certificates
                .issue_for_quiz(
                    quiz,
                    Participant::new(args.name, &args.email),
                    args.correct,
                    args.issued_by,
                )
                .await
                .map_err(|error| format!("failed to issue certificate: {error}"))?;

            println!("certificate_id: {}", certificate.certificate_id);
            println!("verification_url: {}", certificate.verification_url);

            Ok(())
        }
        CertificatesSubcommand::Verify(args) => {
            let verification = context
                .certificates
                .verify_certificate(args.id)
                .await
                .map_err(|error| format!("failed to verify certificate: {error}"))?;

            let certificate = &verification.certificate;

            println!("certificate_id: {}", certificate.certificate_id);
            println!("student: {} <{}>", certificate.student_name, certificate.student_email);
            println!("event: {} ({})", certificate.event_name, certificate.event_date);
            println!("scans: {}", certificate.scan_count);

            match verification.ledger {
                Some(status) => {
                    println!("on_ledger: {}", status.exists);
                    println!("revoked: {}", status.revoked);
                }
                None => println!("ledger: unavailable"),
            }

            println!("valid: {}", verification.is_valid());

            Ok(())
        }
        CertificatesSubcommand::Revoke(args) => {
            if args.reason.trim().is_empty() {
                return Err("reason cannot be empty".to_string());
            }

            let tx_ref = context
                .certificates
                .revoke_certificate(args.id.clone(), args.reason, args.actor)
                .await
                .map_err(|error| format!("failed to revoke certificate: {error}"))?;

            println!("revoked {} in {tx_ref}", args.id);

            Ok(())
        }
    }
}
