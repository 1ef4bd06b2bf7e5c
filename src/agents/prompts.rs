use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::SystemTime;

use tracing::{debug, warn};

/// The three prompt templates the agents render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptName {
    Intent,
    Sql,
    Insight,
}

impl PromptName {
    fn file_name(self) -> &'static str {
        match self {
            PromptName::Intent => "intent.txt",
            PromptName::Sql => "sql.txt",
            PromptName::Insight => "insight.txt",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            PromptName::Intent => include_str!("../../prompts/intent.txt"),
            PromptName::Sql => include_str!("../../prompts/sql.txt"),
            PromptName::Insight => include_str!("../../prompts/insight.txt"),
        }
    }
}

struct CachedPrompt {
    mtime: SystemTime,
    content: String,
}

/// Loads prompt templates fresh on every agent invocation so operators can
/// tune prompts without a restart. A small mtime-keyed cache avoids the read
/// when the file is unchanged; the compiled-in template is the fallback when
/// no override file exists.
pub struct PromptStore {
    dir: Option<PathBuf>,
    cache: Mutex<HashMap<PromptName, CachedPrompt>>,
}

impl PromptStore {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn builtin_only() -> Self {
        Self::new(None)
    }

    pub fn load(&self, name: PromptName) -> String {
        let Some(dir) = &self.dir else {
            return name.builtin().to_string();
        };

        let path = dir.join(name.file_name());
        let mtime = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(_) => return name.builtin().to_string(),
        };

        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(entry) = cache.get(&name) {
            if entry.mtime == mtime {
                return entry.content.clone();
            }
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!(prompt = name.file_name(), "reloaded prompt override");
                cache.insert(name, CachedPrompt { mtime, content: content.clone() });
                content
            }
            Err(e) => {
                warn!(prompt = name.file_name(), "failed to read prompt override: {e}");
                name.builtin().to_string()
            }
        }
    }
}
