use crate::entities::DiaryRecord;
use anyhow::Result;

/// Context provided to append hooks
#[derive(Debug, Clone)]
pub struct AppendContext {
    pub sheet: String,
    /// 1-based row the record was written to
    pub row: usize,
}

/// Trait for plugins that respond to diary records being appended
pub trait AppendHook: Send + Sync {
    /// Called after a record has been written to its row
    fn on_record_appended(&self, context: &AppendContext, record: &DiaryRecord) -> Result<()>;

    /// Human-readable name for this hook
    fn name(&self) -> &str;

    /// Whether this hook should be enabled by default
    fn enabled_by_default(&self) -> bool {
        true
    }
}

/// Registry for managing append hooks
pub struct HookRegistry {
    hooks: Vec<Box<dyn AppendHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Register a new append hook
    pub fn register<H>(&mut self, hook: H)
    where
        H: AppendHook + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    /// Run every registered hook; a failing hook is logged and skipped
    pub fn execute_append_hooks(&self, context: &AppendContext, record: &DiaryRecord) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_record_appended(context, record) {
                log::warn!("Hook '{}' failed: {:#}", hook.name(), e);
            }
        }
    }

    /// List all registered hooks
    pub fn list_hooks(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingHook;

    impl AppendHook for FailingHook {
        fn on_record_appended(&self, _: &AppendContext, _: &DiaryRecord) -> Result<()> {
            Err(anyhow!("disk full"))
        }

        fn name(&self) -> &str {
            "Failing"
        }
    }

    struct CountingHook(Arc<AtomicUsize>);

    impl AppendHook for CountingHook {
        fn on_record_appended(&self, context: &AppendContext, _: &DiaryRecord) -> Result<()> {
            self.0.fetch_add(context.row, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "Counting"
        }
    }

    #[test]
    fn test_failing_hook_does_not_stop_later_hooks() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut registry = HookRegistry::new();
        registry.register(FailingHook);
        registry.register(CountingHook(seen.clone()));

        let context = AppendContext {
            sheet: "DB".to_string(),
            row: 3,
        };
        let record = DiaryRecord::new("2024/06/01", "08:00", "hello");
        registry.execute_append_hooks(&context, &record);

        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(registry.list_hooks(), vec!["Failing", "Counting"]);
    }
}
