//! Report - tables, processed results and the terminal summary

use crate::analysis::{AnalysisResults, ScenarioReport, SensitivityReport};
use crate::error::{AnalysisError, Result};
use beccs_rdm::{infrastructure::write_table, save_csv};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const RAW_RESULTS_FILE: &str = "RDM_raw_results.csv";
pub const CART_RESULTS_FILE: &str = "CART_results.csv";
pub const SOBOL_RESULTS_FILE: &str = "Sobol_results.csv";
pub const PROCESSED_RESULTS_FILE: &str = "RDM_processed_results.json";

/// Number of uncertainties listed in the terminal summary
const TOP_DRIVERS: usize = 5;

/// Write every output of a run into `dir`, returning the files written
pub fn write_outputs(results: &AnalysisResults, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| output_error(dir, e))?;
    let mut written = Vec::new();

    let raw = dir.join(RAW_RESULTS_FILE);
    save_csv(&results.results, &raw)?;
    written.push(raw);

    if let Some(scenarios) = &results.scenarios {
        let path = dir.join(CART_RESULTS_FILE);
        write_file(&path, |w| write_cart_table(scenarios, w))?;
        written.push(path);
    }

    if let Some(sensitivity) = &results.sensitivity {
        let path = dir.join(SOBOL_RESULTS_FILE);
        write_file(&path, |w| write_sobol_table(sensitivity, w))?;
        written.push(path);
    }

    let path = dir.join(PROCESSED_RESULTS_FILE);
    write_file(&path, |w| {
        serde_json::to_writer_pretty(&mut *w, results)?;
        writeln!(w).map_err(|e| output_error(&path, e))
    })?;
    written.push(path);

    for path in &written {
        tracing::info!(path = %path.display(), "Wrote output");
    }
    Ok(written)
}

fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file = File::create(path).map_err(|e| output_error(path, e))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush().map_err(|e| output_error(path, e))
}

fn output_error(path: &Path, source: std::io::Error) -> AnalysisError {
    AnalysisError::Output {
        path: path.display().to_string(),
        source,
    }
}

/// `Node nr, Class, Density, Coverage, Rule(s)`, one rule per trailing cell
pub fn write_cart_table<W: Write>(report: &ScenarioReport, writer: &mut W) -> Result<()> {
    let rule_columns = report
        .scenarios
        .iter()
        .map(|s| s.rules.len())
        .max()
        .unwrap_or(0)
        .max(1);

    let mut header: Vec<String> = ["Node nr", "Class", "Density", "Coverage", "Rule(s)"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.resize(4 + rule_columns, String::new());

    let rows = report.scenarios.iter().map(|s| {
        let mut row = vec![
            s.node.to_string(),
            s.class.clone(),
            s.density.to_string(),
            s.coverage.to_string(),
        ];
        row.extend(s.rules.iter().map(|r| r.to_string()));
        row.resize(4 + rule_columns, String::new());
        row
    });

    Ok(write_table(writer, &header, rows)?)
}

/// `Uncertainty, S1, S1 (confidence interval), ST, ST (confidence interval)`
pub fn write_sobol_table<W: Write>(report: &SensitivityReport, writer: &mut W) -> Result<()> {
    let header: Vec<String> = [
        "Uncertainty",
        "S1",
        "S1 (confidence interval)",
        "ST",
        "ST (confidence interval)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let rows = report.result.indices.iter().map(|i| {
        vec![
            i.name.clone(),
            i.s1.to_string(),
            i.s1_conf.to_string(),
            i.st.to_string(),
            i.st_conf.to_string(),
        ]
    });

    Ok(write_table(writer, &header, rows)?)
}

/// Human-readable summary of a run
pub fn summary(results: &AnalysisResults) -> String {
    Summary(results).to_string()
}

struct Summary<'a>(&'a AnalysisResults);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let results = self.0;
        let r = &results.robustness;

        writeln!(f, "=== BECCS RDM analysis {} ===", results.run_id)?;
        writeln!(
            f,
            "{} SOWs, price trend {}, seed {}, {} ms",
            r.sows,
            results.config.price_trend.name(),
            results.config.seed,
            results.elapsed_ms
        )?;

        writeln!(f, "\n--- Robustness ---")?;
        writeln!(f, "Investing is satisficing in {} SOWs", r.invest_satisficing)?;
        writeln!(f, "Waiting is satisficing in {} SOWs", r.wait_satisficing)?;
        writeln!(
            f,
            "Investing is relative satisficing in {} SOWs",
            r.invest_relative_satisficing
        )?;
        writeln!(
            f,
            "Waiting is relative satisficing in {} SOWs",
            r.wait_relative_satisficing
        )?;
        writeln!(f, "Investing has maximum regret {:.0} EUR", r.invest_max_regret())?;
        writeln!(f, "Waiting has maximum regret {:.0} EUR", r.wait_max_regret())?;
        writeln!(f, "Min-max regret strategy: {}", r.min_max_regret)?;

        if let Some(s) = &results.scenarios {
            writeln!(f, "\n--- Scenario discovery ---")?;
            writeln!(f, "{} reliable, {} unreliable SOWs", s.reliable, s.unreliable)?;
            f.write_str(&s.tree)?;
            for node in &s.scenarios {
                writeln!(
                    f,
                    "Node {}: density {:.1}%, coverage {:.1}%",
                    node.node,
                    100.0 * node.density,
                    100.0 * node.coverage
                )?;
                for rule in &node.rules {
                    writeln!(f, "    {rule}")?;
                }
            }
        }

        if let Some(s) = &results.sensitivity {
            writeln!(
                f,
                "\n--- Sensitivity of {} ({} evaluations) ---",
                s.result.response, s.result.evaluations
            )?;
            for i in s.result.ranked_by_total().into_iter().take(TOP_DRIVERS) {
                writeln!(
                    f,
                    "{:<20} S1 {:>7.3} ± {:.3}   ST {:>7.3} ± {:.3}",
                    i.name, i.s1, i.s1_conf, i.st, i.st_conf
                )?;
            }
            for g in &s.groups {
                writeln!(f, "{:<20} ST {:>7.3}", g.group, g.st)?;
            }
        }

        Ok(())
    }
}
