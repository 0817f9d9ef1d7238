//! Status command implementation
//!
//! This module implements the `status` command for displaying the stored
//! stays and discharges of one visit.

use crate::adapters::store::{create_stay_store, VisitHistory};
use crate::config::load_config;
use crate::domain::VisitId;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Visit (case) number to inspect
    #[arg(long)]
    pub visit_id: i64,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let visit_id = VisitId::new(self.visit_id);
        tracing::info!(visit_id = %visit_id, "Checking visit status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let store = match create_stay_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to initialize store");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        if let Err(e) = store.test_connection().await {
            println!("❌ Failed to connect to store");
            println!("   Error: {e}");
            return Ok(4);
        }

        let history = match store.visit_history(visit_id).await {
            Ok(h) => h,
            Err(e) => {
                println!("❌ Failed to load visit");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        match history {
            Some(history) => print_history(&history),
            None => println!("No visit {visit_id} found."),
        }
        Ok(0)
    }
}

fn print_history(history: &VisitHistory) {
    let visit = &history.visit;

    println!("📊 Visit {}", visit.visit_id);
    println!();
    println!("  Patient: {}", visit.patient_id);
    if let Some(patient) = &history.patient {
        println!("  Date of Birth: {}", patient.date_of_birth);
        println!("  Sex: {}", patient.sex);
    }
    println!("  Admission: {}", visit.admission_date);
    match visit.discharge_date {
        Some(date) => println!("  Discharge: {date}"),
        None => println!("  Discharge: -"),
    }
    println!();

    if history.stays.is_empty() {
        println!("No stays recorded.");
        return;
    }

    println!("Stays:");
    for stay in &history.stays {
        let end = stay
            .end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "open".to_string());
        println!(
            "  #{} movement {}: {} / {} / {}  {} -> {}",
            stay.id, stay.movement_id, stay.ward_id, stay.room_id, stay.bed_id, stay.start_date, end
        );
        for discharge in history.discharges.iter().filter(|d| d.stay_id == stay.id) {
            println!("      discharged by movement {}", discharge.movement_id);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_unknown_visit_on_memory_store() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_target = "memory"

[ingest]
directory = "/var/spool/hl7"
"#
        )
        .unwrap();

        let args = StatusArgs { visit_id: 42 };
        let code = args.execute(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_missing_config() {
        let args = StatusArgs { visit_id: 42 };
        let code = args.execute("/nonexistent/wardsync.toml").await.unwrap();
        assert_eq!(code, 2);
    }
}
