//! Named-template store.
//!
//! Holds raw markup by template id. Parsed trees are cached by the SHA-256 of
//! the template content, so a template re-registered with new content is
//! reparsed and identical templates under different ids share one parse.

use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::parse::{parse_markup, ParseOutput};

#[derive(Default)]
pub struct TemplateStore {
    templates: HashMap<String, String>,
    parsed: RefCell<HashMap<String, Rc<ParseOutput>>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_hash(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn register(&mut self, id: &str, content: &str) {
        self.templates.insert(id.to_string(), content.to_string());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn content_of(&self, id: &str) -> Option<&str> {
        self.templates.get(id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Parsed form of template `id`, reusing an earlier parse of identical content.
    pub fn parse(&self, id: &str) -> Option<Rc<ParseOutput>> {
        let content = self.content_of(id)?;
        let hash = Self::compute_hash(content);

        if let Some(cached) = self.parsed.borrow().get(&hash) {
            return Some(cached.clone());
        }

        debug!(template_id = id, "Parsing template");
        let output = Rc::new(parse_markup(content));
        self.parsed.borrow_mut().insert(hash, output.clone());
        Some(output)
    }

    /// Register every file under `dir` with the given extension, keyed by
    /// file stem. Returns how many templates were loaded.
    pub fn load_dir(&mut self, dir: &Path, extension: &str) -> usize {
        let mut loaded = 0;

        for entry in WalkDir::new(dir).follow_links(true).into_iter().flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != extension) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read_to_string(path) {
                Ok(content) => {
                    self.register(id, &content);
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to read template"),
            }
        }

        debug!(dir = %dir.display(), loaded, "Loaded template directory");
        loaded
    }
}
