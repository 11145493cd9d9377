use std::path::PathBuf;

use clap::Subcommand;
use chrono::NaiveDate;
use watchtower_core::coordination::CoordinationKind;
use watchtower_core::{ComplianceUpdate, CoordinationDraft};

use super::{block_on, CliResult, Context};

#[derive(Subcommand)]
pub enum CoordinationAction {
    /// Create a coordination; unspecified fields take defaults
    Create {
        /// Title
        #[arg(long)]
        title: Option<String>,
        /// Principal investigator
        #[arg(long)]
        pi: Option<String>,
        /// trial_registration, grant_submission, site_activation or patient_enrollment
        #[arg(long)]
        kind: Option<String>,
        /// JSON file with a full or partial coordination
        #[arg(long)]
        from_file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored coordinations
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update the compliance status of a stored coordination
    Compliance {
        /// Coordination id
        id: String,
        #[arg(long)]
        irb: Option<bool>,
        #[arg(long)]
        fda: Option<bool>,
        #[arg(long)]
        institutional: Option<bool>,
        #[arg(long)]
        cpic: Option<bool>,
        #[arg(long)]
        hipaa: Option<bool>,
        #[arg(long)]
        gmp: Option<bool>,
        /// Date of the last audit (YYYY-MM-DD)
        #[arg(long)]
        audit: Option<NaiveDate>,
        /// Certification expiry as NAME=YYYY-MM-DD; repeatable
        #[arg(long = "expires", value_parser = parse_expiry)]
        expires: Vec<(String, NaiveDate)>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_expiry(raw: &str) -> Result<(String, NaiveDate), String> {
    let (name, date) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=YYYY-MM-DD, got '{raw}'"))?;
    let date = date
        .parse::<NaiveDate>()
        .map_err(|e| format!("bad date '{date}': {e}"))?;
    Ok((name.to_string(), date))
}

fn parse_kind(kind: &str) -> Result<CoordinationKind, Box<dyn std::error::Error>> {
    serde_json::from_value(serde_json::Value::String(kind.to_string()))
        .map_err(|_| format!("Unknown coordination kind: {kind}").into())
}

pub fn run(ctx: &Context, action: CoordinationAction) -> CliResult {
    let (_, engine) = ctx.engine()?;
    match action {
        CoordinationAction::Create {
            title,
            pi,
            kind,
            from_file,
            json,
        } => {
            let mut draft: CoordinationDraft = match from_file {
                Some(path) => serde_json::from_str(&std::fs::read_to_string(&path)?)?,
                None => CoordinationDraft::default(),
            };
            if title.is_some() {
                draft.title = title;
            }
            if pi.is_some() {
                draft.principal_investigator = pi;
            }
            if let Some(kind) = kind {
                draft.kind = Some(parse_kind(&kind)?);
            }

            let created = block_on(async move {
                Ok::<_, Box<dyn std::error::Error>>(engine.create_coordination(draft).await?)
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&created)?);
            } else {
                println!("Coordination created: {}", created.id);
                println!("  Title: {}", created.title);
                println!("  Institution: {}", created.institution);
            }
        }
        CoordinationAction::List { json } => {
            let all = block_on(async move {
                Ok::<_, Box<dyn std::error::Error>>(engine.coordinations().await?)
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else if all.is_empty() {
                println!("No coordinations.");
            } else {
                for c in &all {
                    println!("{}  {}  ({})", c.id, c.title, c.principal_investigator);
                }
            }
        }
        CoordinationAction::Compliance {
            id,
            irb,
            fda,
            institutional,
            cpic,
            hipaa,
            gmp,
            audit,
            expires,
            json,
        } => {
            let update = ComplianceUpdate {
                irb_approval: irb,
                fda_approval: fda,
                institutional_approval: institutional,
                cpic_compliance: cpic,
                hipaa_compliance: hipaa,
                gmp_compliance: gmp,
                last_audit: audit,
                expiration_dates: expires.into_iter().collect(),
            };
            if update.is_empty() {
                return Err("nothing to update: pass at least one compliance flag".into());
            }

            let updated = block_on(async move {
                Ok::<_, Box<dyn std::error::Error>>(engine.update_compliance_status(&id, update).await?)
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&updated.compliance)?);
            } else {
                println!("Compliance updated: {}", updated.id);
            }
        }
    }
    Ok(())
}
