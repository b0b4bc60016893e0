use crate::error::Result;

/// Execution seam for `javascript`-kind records.
///
/// The engine never evaluates code itself: the embedder supplies the host
/// that runs record bodies in page context, and with it the execution
/// policy for that trust boundary. Scripts run once per apply with no
/// revert semantics, so re-applying a set re-executes them; idempotence
/// is a convention the script author owns, not an engine guarantee.
pub trait ScriptHost {
    /// Execute a script body in page context
    fn execute(&mut self, source: &str) -> Result<()>;
}

/// Default host that skips execution and logs what it dropped
#[derive(Debug, Default)]
pub struct NoopScriptHost;

impl ScriptHost for NoopScriptHost {
    fn execute(&mut self, source: &str) -> Result<()> {
        log::debug!("no script host configured, skipping {} byte script", source.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_host_succeeds() {
        let mut host = NoopScriptHost;
        assert!(host.execute("console.log('hi')").is_ok());
    }
}
