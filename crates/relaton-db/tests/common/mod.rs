//! Fake resolvers and helpers shared by the integration tests.

#![allow(dead_code)]

use std::any::Any;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Days, NaiveDate};
use regex::Regex;
use relaton_db::{
    BibliographicItem, Clock, Db, FetchOptions, Reference, Resolver, ResolverError,
    ResolverRegistry,
};
use tempfile::TempDir;

/// Record produced by [`FakeResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeItem {
    pub prefix: String,
    pub docid: String,
    pub project_number: String,
}

impl BibliographicItem for FakeItem {
    fn docidentifier(&self) -> Option<&str> {
        Some(&self.docid)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// In-memory resolver that logs every fetch it receives.
pub struct FakeResolver {
    prefix: String,
    default_prefix: Option<Regex>,
    version: String,
    documents: BTreeMap<String, String>,
    failing: bool,
    requests: Arc<Mutex<Vec<Reference>>>,
}

impl FakeResolver {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            default_prefix: None,
            version: version.to_string(),
            documents: BTreeMap::new(),
            failing: false,
            requests: Arc::default(),
        }
    }

    pub fn with_default_prefix(mut self, pattern: &str) -> Self {
        self.default_prefix = Some(Regex::new(pattern).unwrap());
        self
    }

    /// Serve `code` with the given project number.
    pub fn with_document(mut self, code: &str, project_number: &str) -> Self {
        self.documents
            .insert(code.to_string(), project_number.to_string());
        self
    }

    /// Fail every fetch with a network error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<Reference>>> {
        Arc::clone(&self.requests)
    }
}

impl Resolver for FakeResolver {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn default_prefix(&self) -> Option<&Regex> {
        self.default_prefix.as_ref()
    }

    fn schema_version(&self) -> &str {
        &self.version
    }

    fn fetch(
        &self,
        reference: &Reference,
        _opts: &FetchOptions,
    ) -> Result<Option<Box<dyn BibliographicItem>>, ResolverError> {
        self.requests.lock().unwrap().push(reference.clone());

        if self.failing {
            return Err(ResolverError::Network {
                message: "connection reset".to_string(),
            });
        }

        Ok(self.documents.get(&reference.code).map(|project_number| {
            let docid = match &reference.year {
                Some(year) => format!("{}:{}", reference.code, year),
                None => reference.code.clone(),
            };
            Box::new(FakeItem {
                prefix: self.prefix.clone(),
                docid,
                project_number: project_number.clone(),
            }) as Box<dyn BibliographicItem>
        }))
    }

    fn serialize(&self, item: &dyn BibliographicItem) -> Result<String, ResolverError> {
        let item = item
            .downcast_ref::<FakeItem>()
            .ok_or_else(|| ResolverError::Parse {
                message: "foreign record".to_string(),
            })?;
        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<bibdata type=\"standard\"><docidentifier type=\"{}\">{}</docidentifier><project-number>{}</project-number></bibdata>",
            item.prefix, item.docid, item.project_number
        ))
    }

    fn deserialize(&self, payload: &str) -> Result<Box<dyn BibliographicItem>, ResolverError> {
        let docid = element_text(payload, "docidentifier");
        let project_number = element_text(payload, "project-number");
        match (docid, project_number) {
            (Some(docid), Some(project_number)) => Ok(Box::new(FakeItem {
                prefix: self.prefix.clone(),
                docid,
                project_number,
            })),
            _ => Err(ResolverError::Parse {
                message: format!("not a bibdata record: {}", payload),
            }),
        }
    }
}

fn element_text(xml: &str, tag: &str) -> Option<String> {
    let open = xml.find(&format!("<{}", tag))?;
    let start = open + xml[open..].find('>')? + 1;
    let end = start + xml[start..].find(&format!("</{}>", tag))?;
    Some(xml[start..end].to_string())
}

/// Clock that tests can move forward.
#[derive(Clone)]
pub struct TestClock {
    base: NaiveDate,
    offset: Arc<AtomicI64>,
}

impl TestClock {
    pub fn new(base: NaiveDate) -> Self {
        Self {
            base,
            offset: Arc::default(),
        }
    }

    pub fn advance_day(&self) {
        self.offset.fetch_add(1, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn today(&self) -> NaiveDate {
        let offset = self.offset.load(Ordering::SeqCst) as u64;
        self.base + Days::new(offset)
    }
}

/// Shared in-memory diagnostics sink.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

pub fn no_opts() -> FetchOptions {
    FetchOptions::new()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("relaton_db=debug")
        .try_init();
}

/// Temporary workspace holding both tier directories.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        init_tracing();
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn global(&self) -> PathBuf {
        self.dir.path().join("testcache")
    }

    pub fn local(&self) -> PathBuf {
        self.dir.path().join("testcache2")
    }

    pub fn open(&self, registry: ResolverRegistry) -> Db {
        Db::new(self.global(), self.local(), Arc::new(registry)).unwrap()
    }
}

/// ISO resolver knowing a handful of documents.
pub fn iso(version: &str) -> FakeResolver {
    FakeResolver::new("ISO", version)
        .with_document("ISO 19115-1", "ISO 19115")
        .with_document("ISO 19115-2", "ISO 19115")
        .with_document("ISO 19115", "ISO 19115")
        .with_document("ISO 19133", "ISO 19133")
        .with_document("ISO/AWI 24229", "ISO 24229")
}

pub fn ietf(version: &str) -> FakeResolver {
    FakeResolver::new("IETF", version)
        .with_default_prefix(r"^RFC\s")
        .with_document("RFC 8341", "RFC 8341")
}

pub fn gb(version: &str) -> FakeResolver {
    FakeResolver::new("CN", version).with_document("GB/T 20223", "GB/T 20223")
}
