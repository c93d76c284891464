// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Streaming (Paged) Term Store
// ─────────────────────────────────────────────────────────────────────
//! Out-of-core term storage for models with more terms than fit in
//! memory.
//!
//! Terms fill an in-memory page; a full page is flushed to
//! `<dir>/NNNNNNNN.page` and a fresh one started. Iteration pages each
//! file back in (one resident page at a time) so later epochs reuse the
//! grounding instead of paying for it again. The trailing, unflushed
//! page never leaves memory.

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tempfile::TempDir;

use hlmrf_types::{HlmrfError, HlmrfResult, StreamingConfig};

use crate::page;
use crate::store::{TermStore, TermVisitor};
use crate::term::Term;
use crate::variables::VariableStore;

#[derive(Debug)]
enum PageDir {
    /// Removed, with everything in it, when dropped.
    Temp(TempDir),
    /// Caller-owned directory; only our page files are removed.
    Fixed(PathBuf),
}

impl PageDir {
    fn path(&self) -> &Path {
        match self {
            PageDir::Temp(dir) => dir.path(),
            PageDir::Fixed(path) => path,
        }
    }
}

pub struct StreamingTermStore {
    config: StreamingConfig,
    variables: VariableStore,
    dir: Option<PageDir>,
    /// Number of pages flushed to disk.
    flushed_pages: usize,
    /// Page currently being filled.
    tail: Vec<Term>,
    /// Most recently paged-in page.
    cache: Vec<Term>,
    resident: Option<usize>,
    page_order: Vec<usize>,
    num_terms: usize,
    page_reads: usize,
    rng: StdRng,
    constraint_warned: bool,
}

impl StreamingTermStore {
    pub fn new(config: StreamingConfig) -> HlmrfResult<Self> {
        config.validate()?;
        let dir = match &config.page_location {
            Some(path) => {
                fs::create_dir_all(path).map_err(|e| HlmrfError::io(path, e))?;
                PageDir::Fixed(path.clone())
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("hlmrf-pages-")
                    .tempdir()
                    .map_err(|e| HlmrfError::io(std::env::temp_dir(), e))?;
                PageDir::Temp(dir)
            }
        };
        log::debug!(
            "streaming term store at {} (page size {})",
            dir.path().display(),
            config.page_size
        );
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            tail: Vec::with_capacity(config.page_size),
            config,
            variables: VariableStore::new(),
            dir: Some(dir),
            flushed_pages: 0,
            cache: Vec::new(),
            resident: None,
            page_order: Vec::new(),
            num_terms: 0,
            page_reads: 0,
            constraint_warned: false,
        })
    }

    /// Pages on disk plus the in-memory tail (if it holds anything).
    pub fn num_pages(&self) -> usize {
        self.flushed_pages + usize::from(!self.tail.is_empty())
    }

    /// How many times a page file has been read back.
    pub fn page_reads(&self) -> usize {
        self.page_reads
    }

    pub fn page_dir(&self) -> Option<&Path> {
        self.dir.as_ref().map(PageDir::path)
    }

    fn dir(&self) -> HlmrfResult<&Path> {
        self.page_dir()
            .ok_or_else(|| HlmrfError::State("streaming term store is closed".to_string()))
    }

    fn page_path(&self, page: usize) -> HlmrfResult<PathBuf> {
        Ok(self.dir()?.join(format!("{page:08}.page")))
    }

    fn flush_tail(&mut self) -> HlmrfResult<()> {
        let path = self.page_path(self.flushed_pages)?;
        page::write_page(&path, &self.tail)?;
        log::trace!("flushed {} terms to {}", self.tail.len(), path.display());
        self.flushed_pages += 1;
        self.tail.clear();
        Ok(())
    }

    /// Make `page` the resident page, reading it only if it is not
    /// already in the cache.
    fn page_in(&mut self, page: usize) -> HlmrfResult<()> {
        if self.resident != Some(page) {
            let path = self.page_path(page)?;
            self.cache = page::read_page(&path)?;
            self.resident = Some(page);
            self.page_reads += 1;
        }
        if self.config.shuffle_page {
            self.cache.shuffle(&mut self.rng);
        }
        Ok(())
    }

    fn remove_pages(&mut self) -> HlmrfResult<()> {
        for p in 0..self.flushed_pages {
            let path = self.page_path(p)?;
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(HlmrfError::io(path, e)),
            }
        }
        Ok(())
    }
}

impl TermStore for StreamingTermStore {
    fn variables(&self) -> &VariableStore {
        &self.variables
    }

    fn variables_mut(&mut self) -> &mut VariableStore {
        &mut self.variables
    }

    fn add_term(&mut self, term: Term) -> HlmrfResult<bool> {
        self.dir()?;
        if term.kind.is_constraint() {
            if !self.constraint_warned {
                log::warn!(
                    "streaming term store cannot hold hard constraints; dropping constraint terms (first from {})",
                    term.rule
                );
                self.constraint_warned = true;
            }
            return Ok(false);
        }

        self.tail.push(term);
        self.num_terms += 1;
        if self.tail.len() >= self.config.page_size {
            self.flush_tail()?;
        }
        Ok(true)
    }

    fn size(&self) -> usize {
        self.num_terms
    }

    fn for_each_term(&mut self, visit: TermVisitor<'_>) -> HlmrfResult<()> {
        self.dir()?;
        // Page id `flushed_pages` stands for the in-memory tail.
        let total = self.num_pages();
        self.page_order.clear();
        self.page_order.extend(0..total);
        if self.config.randomize_page_access {
            self.page_order.shuffle(&mut self.rng);
        }

        for i in 0..self.page_order.len() {
            let page = self.page_order[i];
            if page == self.flushed_pages {
                if self.config.shuffle_page {
                    self.tail.shuffle(&mut self.rng);
                }
                for term in &self.tail {
                    visit(term, self.variables.values_mut())?;
                }
            } else {
                self.page_in(page)?;
                for term in &self.cache {
                    visit(term, self.variables.values_mut())?;
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self) -> HlmrfResult<()> {
        self.remove_pages()?;
        self.flushed_pages = 0;
        self.tail.clear();
        self.cache.clear();
        self.resident = None;
        self.num_terms = 0;
        self.variables.clear();
        Ok(())
    }

    fn close(&mut self) -> HlmrfResult<()> {
        if self.dir.is_none() {
            return Ok(());
        }
        self.clear()?;
        if let Some(PageDir::Temp(dir)) = self.dir.take() {
            let path = dir.path().to_path_buf();
            dir.close().map_err(|e| HlmrfError::io(path, e))?;
        }
        Ok(())
    }

    fn supports_constraints(&self) -> bool {
        false
    }
}

impl Drop for StreamingTermStore {
    fn drop(&mut self) {
        if self.dir.is_some() {
            if let Err(e) = self.remove_pages() {
                log::warn!("failed to remove term pages: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::TermKind;
    use hlmrf_types::{AtomId, Comparator, RuleId};

    fn config(page_size: usize, dir: &Path) -> StreamingConfig {
        StreamingConfig {
            page_size,
            page_location: Some(dir.to_path_buf()),
            shuffle_page: false,
            randomize_page_access: false,
            seed: 11,
        }
    }

    fn hinge(rule: u32) -> Term {
        Term::new(RuleId(rule), TermKind::Hinge, vec![1.0], vec![0], 0.5).unwrap()
    }

    fn collect(store: &mut StreamingTermStore) -> Vec<u32> {
        let mut seen = Vec::new();
        store
            .for_each_term(&mut |t, _| {
                seen.push(t.rule.0);
                Ok(())
            })
            .unwrap();
        seen
    }

    #[test]
    fn test_spans_pages_in_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StreamingTermStore::new(config(4, dir.path())).unwrap();
        store.create_variable(AtomId(0), 0.0);
        for r in 0..10 {
            assert!(store.add_term(hinge(r)).unwrap());
        }
        assert_eq!(store.size(), 10);
        assert_eq!(store.num_pages(), 3);
        assert!(dir.path().join("00000000.page").exists());
        assert!(dir.path().join("00000001.page").exists());
        assert!(!dir.path().join("00000002.page").exists());

        assert_eq!(collect(&mut store), (0..10).collect::<Vec<_>>());
        // Second pass yields the same order.
        assert_eq!(collect(&mut store), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffled_pass_visits_every_term() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(3, dir.path());
        cfg.shuffle_page = true;
        cfg.randomize_page_access = true;
        let mut store = StreamingTermStore::new(cfg).unwrap();
        store.create_variable(AtomId(0), 0.0);
        for r in 0..20 {
            store.add_term(hinge(r)).unwrap();
        }
        for _ in 0..3 {
            let mut seen = collect(&mut store);
            assert_eq!(seen.len(), 20);
            seen.sort_unstable();
            assert_eq!(seen, (0..20).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_resident_page_not_reread() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StreamingTermStore::new(config(2, dir.path())).unwrap();
        store.create_variable(AtomId(0), 0.0);
        for r in 0..2 {
            store.add_term(hinge(r)).unwrap();
        }
        // One full page on disk, empty tail.
        assert_eq!(store.num_pages(), 1);
        collect(&mut store);
        collect(&mut store);
        assert_eq!(store.page_reads(), 1);
    }

    #[test]
    fn test_constraint_terms_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StreamingTermStore::new(config(4, dir.path())).unwrap();
        let term = Term::new(
            RuleId(0),
            TermKind::Constraint(Comparator::Equal),
            vec![1.0],
            vec![0],
            1.0,
        )
        .unwrap();
        assert!(!store.add_term(term.clone()).unwrap());
        assert!(!store.add_term(term).unwrap());
        assert_eq!(store.size(), 0);
        assert!(!store.supports_constraints());
    }

    #[test]
    fn test_visitor_updates_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StreamingTermStore::new(config(1, dir.path())).unwrap();
        let slot = store.create_variable(AtomId(5), 0.0);
        store.add_term(hinge(0)).unwrap();
        store
            .for_each_term(&mut |_, values| {
                values[slot] += 0.5;
                Ok(())
            })
            .unwrap();
        assert!((store.values()[slot] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_close_removes_pages() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StreamingTermStore::new(config(2, dir.path())).unwrap();
        for r in 0..5 {
            store.add_term(hinge(r)).unwrap();
        }
        assert!(dir.path().join("00000001.page").exists());
        store.close().unwrap();
        assert!(!dir.path().join("00000000.page").exists());
        assert!(!dir.path().join("00000001.page").exists());
        assert!(store.add_term(hinge(9)).is_err());
        assert!(store.for_each_term(&mut |_, _| Ok(())).is_err());
    }

    #[test]
    fn test_temp_dir_removed_on_close() {
        let cfg = StreamingConfig {
            page_size: 2,
            ..StreamingConfig::default()
        };
        let mut store = StreamingTermStore::new(cfg).unwrap();
        for r in 0..4 {
            store.add_term(hinge(r)).unwrap();
        }
        let path = store.page_dir().unwrap().to_path_buf();
        assert!(path.exists());
        store.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_clear_keeps_store_usable() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StreamingTermStore::new(config(2, dir.path())).unwrap();
        store.create_variable(AtomId(0), 0.0);
        for r in 0..5 {
            store.add_term(hinge(r)).unwrap();
        }
        store.clear().unwrap();
        assert_eq!(store.size(), 0);
        assert_eq!(store.num_variables(), 0);
        store.create_variable(AtomId(0), 0.0);
        store.add_term(hinge(42)).unwrap();
        assert_eq!(collect(&mut store), vec![42]);
    }
}
