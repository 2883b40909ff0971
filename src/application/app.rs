use crate::application::Config;
use crate::entities::Diary;
use crate::infrastructure::{
    AppendHook, AppendLogHook, Clock, DuckDbWorkbook, HookRegistry, MemoryWorkbook, SheetBinding,
    SheetDiaryRepository, SystemClock, initialize_diary_sheet,
};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Wires a workbook, the diary sheet and the clock into a ready `Diary`.
pub struct DiaryApp {
    diary: Arc<Diary>,
    binding: Arc<dyn SheetBinding>,
    config: Config,
}

impl DiaryApp {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_default_plugins(config)
    }

    /// Open the DuckDB workbook at `config.database_path` with the append log enabled
    pub fn with_default_plugins(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.diary_dir).with_context(|| {
            format!("Failed to create diary directory {}", config.diary_dir.display())
        })?;

        let mut hook_registry = HookRegistry::new();
        let append_log = AppendLogHook::new(&config.diary_dir);
        if append_log.enabled_by_default() {
            hook_registry.register(append_log);
        }
        log::debug!("Append hooks: {:?}", hook_registry.list_hooks());

        let binding = open_workbook(&config)?;
        Ok(Self::from_parts(
            binding,
            config,
            Box::new(SystemClock),
            hook_registry,
        ))
    }

    pub fn without_plugins(config: Config) -> Result<Self> {
        let binding = open_workbook(&config)?;
        Ok(Self::from_parts(
            binding,
            config,
            Box::new(SystemClock),
            HookRegistry::new(),
        ))
    }

    /// A throwaway diary whose rows live only as long as the process
    pub fn in_memory(config: Config) -> Self {
        Self::from_parts(
            Arc::new(MemoryWorkbook::new()),
            config,
            Box::new(SystemClock),
            HookRegistry::new(),
        )
    }

    pub fn from_parts(
        binding: Arc<dyn SheetBinding>,
        config: Config,
        clock: Box<dyn Clock>,
        hook_registry: HookRegistry,
    ) -> Self {
        let repository =
            SheetDiaryRepository::with_hooks(binding.clone(), config.sheet_name.clone(), hook_registry);
        let diary = Diary::new(Box::new(repository), clock, config.utc_offset);

        Self {
            diary: Arc::new(diary),
            binding,
            config,
        }
    }

    /// Create the diary sheet with its reserved rows if it is missing
    pub fn init_storage(&self) -> Result<bool> {
        let created = initialize_diary_sheet(self.binding.as_ref(), &self.config.sheet_name)?;
        if created {
            log::info!(
                "Created sheet '{}' in {}",
                self.config.sheet_name,
                self.binding.backend_info()
            );
        }
        Ok(created)
    }

    pub fn diary(&self) -> Arc<Diary> {
        self.diary.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn open_workbook(config: &Config) -> Result<Arc<dyn SheetBinding>> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let workbook = DuckDbWorkbook::new(&config.database_path).with_context(|| {
        format!(
            "Failed to open diary database {}",
            config.database_path.display()
        )
    })?;
    Ok(Arc::new(workbook))
}
