use std::time::Duration;

/// Run-level summary, printed at the end of every run or pause.
#[derive(Debug, Default)]
pub struct RunStats {
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
    pub raw_fetch_cost_usd: f64,
    pub enrichment_cost_usd: f64,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn total_cost_usd(&self) -> f64 {
        self.raw_fetch_cost_usd + self.enrichment_cost_usd
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Enrichment Run Complete ===")?;
        writeln!(f, "Succeeded:       {}", self.succeeded)?;
        writeln!(f, "Failed:          {}", self.failed)?;
        writeln!(f, "Skipped:         {}", self.skipped)?;
        writeln!(f, "Raw fetch cost:  ${:.4}", self.raw_fetch_cost_usd)?;
        writeln!(f, "Enrichment cost: ${:.4}", self.enrichment_cost_usd)?;
        writeln!(f, "Total cost:      ${:.4}", self.total_cost_usd())?;
        writeln!(f, "Elapsed:         {:.1}s", self.elapsed.as_secs_f64())?;
        Ok(())
    }
}
