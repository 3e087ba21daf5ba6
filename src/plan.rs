use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::algo::clustering::{group_files, FileEntry};
use crate::algo::embedding::{Embedder, HashingEmbedder};
use crate::algo::misc::{classify_misc, ExtensionMap, MiscBuckets, MISC_FOLDER, UNGROUPED_CATEGORY};
use crate::algo::naming::NameRegistry;
use crate::algo::nmf::TopicModel;
use crate::algo::tfidf::Vectorizer;
use crate::apply::flatten_directory;
use crate::config::{Config, ModelSettings, Parameters};
use crate::error::{FoldersError, Result};
use crate::reader::scan_directory;
use crate::tree;

/// Groups larger than this are planned again with [`SUBDIVIDE_THRESHOLD`].
pub const SUBDIVIDE_FAN_OUT: usize = 6;

/// Similarity threshold used when subdividing an oversized group.
pub const SUBDIVIDE_THRESHOLD: f64 = 0.75;

/// Target layout of one directory level.
///
/// `folders` keep the order in which their groups were discovered. `loose`
/// files stay directly in the directory; at the top level they are always
/// empty because ungrouped files go to `misc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderPlan {
    pub folders: Vec<Folder>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loose: Vec<String>,
    /// Category → files, placed under [`MISC_FOLDER`].
    #[serde(default, skip_serializing_if = "MiscBuckets::is_empty")]
    pub misc: MiscBuckets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub name: String,
    pub contents: FolderContents,
}

/// A leaf file list or a further subdivided level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FolderContents {
    Files(Vec<String>),
    Nested(FolderPlan),
}

impl FolderPlan {
    /// Folder names at this level in plan order, `_misc` last when present.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.folders.iter().map(|f| f.name.as_str()).collect();
        if !self.misc.is_empty() {
            keys.push(MISC_FOLDER);
        }
        keys
    }

    /// Every filename in the plan, depth first, in plan order.
    pub fn files(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a str>) {
        for folder in &self.folders {
            match &folder.contents {
                FolderContents::Files(files) => out.extend(files.iter().map(String::as_str)),
                FolderContents::Nested(plan) => plan.collect_files(out),
            }
        }
        out.extend(self.loose.iter().map(String::as_str));
        for files in self.misc.values() {
            out.extend(files.iter().map(String::as_str));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.loose.is_empty() && self.misc.is_empty()
    }
}

/// Models used by a planning run.
///
/// The embedder is loaded once and shared by every level. Term-weighting and
/// topic models are fitted fresh for each level from `settings`.
pub struct ModelContext {
    pub embedder: Box<dyn Embedder>,
    pub settings: ModelSettings,
}

impl ModelContext {
    pub fn new(embedder: Box<dyn Embedder>, settings: ModelSettings) -> Self {
        Self { embedder, settings }
    }

    /// Feature-hashing embeddings sized by `settings.embedding_dim`.
    pub fn hashing(settings: ModelSettings) -> Self {
        let embedder = HashingEmbedder::new(settings.embedding_dim);
        Self::new(Box::new(embedder), settings)
    }

    /// The best embedder compiled in: the sentence-transformer model with the
    /// `fastembed` feature, feature hashing otherwise.
    pub fn from_settings(settings: ModelSettings) -> Result<Self> {
        #[cfg(feature = "fastembed")]
        {
            let embedder = crate::algo::embedding::FastEmbedder::new()?;
            Ok(Self::new(Box::new(embedder), settings))
        }
        #[cfg(not(feature = "fastembed"))]
        {
            Ok(Self::hashing(settings))
        }
    }
}

/// Builds a [`FolderPlan`] from already-read files. Touches no files.
pub struct Planner<'a> {
    models: &'a ModelContext,
    parameters: Parameters,
}

impl<'a> Planner<'a> {
    pub fn new(models: &'a ModelContext, parameters: Parameters) -> Self {
        Self { models, parameters }
    }

    /// Plan the top level of a directory.
    ///
    /// Readable files that join no group and every unreadable file end up in
    /// `misc`; ungrouped readable files under [`UNGROUPED_CATEGORY`].
    pub fn plan(&self, entries: &[FileEntry], misc: &[String], ext_map: &ExtensionMap) -> Result<FolderPlan> {
        self.parameters.validate()?;

        let (folders, ungrouped) = self.plan_level(entries, misc, self.parameters.threshold_fraction(), false)?;

        let mut buckets = classify_misc(misc, ext_map);
        if !ungrouped.is_empty() {
            buckets
                .entry(UNGROUPED_CATEGORY.to_string())
                .or_default()
                .extend(ungrouped);
        }

        Ok(FolderPlan {
            folders,
            loose: vec![],
            misc: buckets,
        })
    }

    /// Group, name and (when oversized) subdivide one level.
    ///
    /// Folder names never equal a file name at the same level (`entries` or
    /// `siblings`), so the folder can always be created next to them.
    /// Returns the folders and the files that joined no group, in input order.
    fn plan_level(
        &self,
        entries: &[FileEntry],
        siblings: &[String],
        threshold: f64,
        nested: bool,
    ) -> Result<(Vec<Folder>, Vec<String>)> {
        if entries.is_empty() {
            return Ok((vec![], vec![]));
        }

        let groups = group_files(entries, self.models.embedder.as_ref(), threshold)?;

        let settings = &self.models.settings;
        let contents: Vec<&str> = entries.iter().map(|e| e.content.as_str()).collect();
        let vectorizer = Vectorizer::fit(&contents, &settings.vectorizer());
        let topics = TopicModel::fit(&vectorizer.transform(&contents), &settings.topic());

        let mut registry = NameRegistry::new(
            &vectorizer,
            &topics,
            self.parameters.folder_word_limit,
            &settings.delimiter,
        );
        registry.reserve(MISC_FOLDER);
        for name in entries.iter().map(|e| e.name.as_str()).chain(siblings.iter().map(String::as_str)) {
            registry.reserve(name);
        }

        let by_name: HashMap<&str, &FileEntry> = entries.iter().map(|e| (e.name.as_str(), e)).collect();
        let mut grouped: HashSet<String> = HashSet::new();
        let mut folders = Vec::with_capacity(groups.len());

        for group in groups {
            let members: Vec<FileEntry> = group
                .members
                .iter()
                .filter_map(|m| by_name.get(m.as_str()).map(|e| (*e).clone()))
                .collect();
            grouped.extend(group.members.iter().cloned());

            let member_contents: Vec<&str> = members.iter().map(|e| e.content.as_str()).collect();
            let name = registry.assign(&member_contents);

            // A nested level that regrouped everything into one group would
            // recurse on the same input forever.
            let shrinks = !nested || members.len() < entries.len();
            let layout = if members.len() > SUBDIVIDE_FAN_OUT && shrinks {
                self.subdivide(&name, members, group.members)?
            } else {
                FolderContents::Files(group.members)
            };
            folders.push(Folder { name, contents: layout });
        }

        let ungrouped = entries
            .iter()
            .filter(|e| !grouped.contains(&e.name))
            .map(|e| e.name.clone())
            .collect();
        Ok((folders, ungrouped))
    }

    fn subdivide(&self, name: &str, members: Vec<FileEntry>, files: Vec<String>) -> Result<FolderContents> {
        let (folders, loose) = self.plan_level(&members, &[], SUBDIVIDE_THRESHOLD, true)?;
        if folders.len() < 2 {
            debug!(folder = name, files = files.len(), "group not subdivided");
            return Ok(FolderContents::Files(files));
        }
        debug!(
            folder = name,
            files = files.len(),
            subfolders = folders.len(),
            loose = loose.len(),
            "subdivided oversized group"
        );
        Ok(FolderContents::Nested(FolderPlan {
            folders,
            loose,
            misc: MiscBuckets::new(),
        }))
    }
}

/// Flatten `dir`, read it and plan it.
///
/// Returns the plan and its rendered preview. Fails before touching the
/// directory if it does not exist or is not a directory.
pub fn build_plan(dir: &Path, config: &Config, models: &ModelContext) -> Result<(FolderPlan, String)> {
    if !dir.exists() {
        return Err(FoldersError::MissingDirectory(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(FoldersError::NotADirectory(dir.to_path_buf()));
    }
    config.parameters.validate()?;

    flatten_directory(dir)?;
    let (entries, misc) = scan_directory(dir, config.parameters.reading_word_limit, &config.stop_word_set())?;

    let plan = Planner::new(models, config.parameters).plan(&entries, &misc, &config.extension_map)?;
    let preview = tree::render(&dir.display().to_string(), &plan);

    info!(
        dir = %dir.display(),
        readable = entries.len(),
        misc = misc.len(),
        folders = plan.folders.len(),
        model = models.embedder.name(),
        "built folder plan"
    );
    Ok((plan, preview))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Looks up a fixed vector per content string.
    struct TableEmbedder(HashMap<String, Vec<f32>>);

    impl Embedder for TableEmbedder {
        fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            texts
                .iter()
                .map(|t| {
                    self.0
                        .get(*t)
                        .cloned()
                        .ok_or_else(|| FoldersError::Embedding(format!("no vector for '{t}'")))
                })
                .collect()
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    fn params(threshold: u32) -> Parameters {
        Parameters {
            folder_word_limit: 2,
            reading_word_limit: 200,
            similarity_threshold: threshold,
        }
    }

    fn hashing() -> ModelContext {
        ModelContext::hashing(ModelSettings::default())
    }

    fn names(plan: &FolderPlan) -> Vec<String> {
        let mut files: Vec<String> = plan.files().into_iter().map(String::from).collect();
        files.sort();
        files
    }

    #[test]
    fn scenario_two_similar_texts_and_an_image() {
        let models = hashing();
        let entries = vec![
            FileEntry::new("a.txt", "alpha beta"),
            FileEntry::new("b.txt", "alpha beta gamma"),
        ];
        let plan = Planner::new(&models, params(50))
            .plan(&entries, &["c.jpg".to_string()], &ExtensionMap::new())
            .unwrap();

        assert_eq!(plan.keys().len(), 2);
        assert_eq!(plan.keys()[1], MISC_FOLDER);
        assert_eq!(
            plan.folders[0].contents,
            FolderContents::Files(vec!["a.txt".into(), "b.txt".into()])
        );
        assert_eq!(plan.misc["jpg"], vec!["c.jpg"]);
        assert!(!plan.misc.contains_key(UNGROUPED_CATEGORY));
    }

    #[test]
    fn partition_is_complete() {
        let models = hashing();
        let entries = vec![
            FileEntry::new("1.txt", "budget invoice payment"),
            FileEntry::new("2.txt", "budget invoice payment due"),
            FileEntry::new("3.txt", "pasta tomato recipe"),
            FileEntry::new("4.txt", "pasta tomato recipe basil"),
            FileEntry::new("5.txt", "telescope galaxy"),
            FileEntry::new("6.txt", ""),
        ];
        let misc = vec!["song.mp3".to_string(), "Makefile".to_string()];
        let plan = Planner::new(&models, params(50))
            .plan(&entries, &misc, &ExtensionMap::new())
            .unwrap();

        let mut expected: Vec<String> = entries.iter().map(|e| e.name.clone()).chain(misc).collect();
        expected.sort();
        assert_eq!(names(&plan), expected);
        assert!(plan.misc.keys().all(|k| !k.is_empty()));
        assert!(plan.misc[UNGROUPED_CATEGORY].contains(&"6.txt".to_string()));
    }

    #[test]
    fn planning_is_deterministic() {
        let models = hashing();
        let entries = vec![
            FileEntry::new("a.txt", "quarterly report revenue"),
            FileEntry::new("b.txt", "quarterly report revenue growth"),
            FileEntry::new("c.txt", "holiday photos beach"),
            FileEntry::new("d.txt", "holiday photos beach sunset"),
        ];
        let planner = Planner::new(&models, params(50));
        let first = planner.plan(&entries, &[], &ExtensionMap::new()).unwrap();
        let second = planner.plan(&entries, &[], &ExtensionMap::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(tree::render("root", &first), tree::render("root", &second));
    }

    #[test]
    fn full_threshold_groups_nothing() {
        let models = hashing();
        let entries = vec![
            FileEntry::new("a.txt", "alpha beta"),
            FileEntry::new("b.txt", "alpha beta gamma"),
            FileEntry::new("c.txt", "alpha delta"),
        ];
        let plan = Planner::new(&models, params(100))
            .plan(&entries, &[], &ExtensionMap::new())
            .unwrap();
        assert!(plan.folders.is_empty());
        assert_eq!(plan.misc[UNGROUPED_CATEGORY], vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn invalid_threshold_rejected() {
        let models = hashing();
        let err = Planner::new(&models, params(150))
            .plan(&[], &[], &ExtensionMap::new())
            .unwrap_err();
        assert!(matches!(err, FoldersError::InvalidParameter(_)));
    }

    #[test]
    fn empty_input_gives_empty_plan() {
        let models = hashing();
        let plan = Planner::new(&models, params(50)).plan(&[], &[], &ExtensionMap::new()).unwrap();
        assert!(plan.is_empty());
        assert!(plan.keys().is_empty());
    }

    /// `per_cluster` finance files then `per_cluster` food files; the two
    /// clusters are ~0.55 apart.
    fn two_clusters(per_cluster: usize) -> (HashMap<String, Vec<f32>>, Vec<FileEntry>) {
        let mut table = HashMap::new();
        let mut entries = Vec::new();
        for i in 1..=per_cluster {
            let content = format!("budget invoice payment ledger{i}");
            table.insert(content.clone(), vec![1.0, 0.3]);
            entries.push(FileEntry::new(format!("fin{i}.txt"), content));
        }
        for i in 1..=per_cluster {
            let content = format!("pasta tomato recipe basil{i}");
            table.insert(content.clone(), vec![0.3, 1.0]);
            entries.push(FileEntry::new(format!("food{i}.txt"), content));
        }
        (table, entries)
    }

    fn two_cluster_context() -> (ModelContext, Vec<FileEntry>) {
        let (table, entries) = two_clusters(4);
        let models = ModelContext::new(Box::new(TableEmbedder(table)), ModelSettings::default());
        (models, entries)
    }

    #[test]
    fn oversized_group_is_subdivided() {
        let (models, entries) = two_cluster_context();
        // cos([1, .3], [.3, 1]) ~ 0.55: one group at 50%, two at 75%
        let plan = Planner::new(&models, params(50))
            .plan(&entries, &[], &ExtensionMap::new())
            .unwrap();

        assert_eq!(plan.folders.len(), 1);
        let FolderContents::Nested(sub) = &plan.folders[0].contents else {
            panic!("expected nested folder, got {:?}", plan.folders[0].contents);
        };
        assert_eq!(sub.folders.len(), 2);
        assert!(sub.loose.is_empty());
        assert!(sub.misc.is_empty());
        assert_eq!(
            sub.folders[0].contents,
            FolderContents::Files(vec!["fin1.txt".into(), "fin2.txt".into(), "fin3.txt".into(), "fin4.txt".into()])
        );
        assert_ne!(sub.folders[0].name, sub.folders[1].name);
        assert_eq!(names(&plan).len(), 8);
    }

    #[test]
    fn uniform_group_stays_flat() {
        let mut table = HashMap::new();
        let mut entries = Vec::new();
        for i in 1..=8 {
            let content = format!("same topic file{i}");
            table.insert(content.clone(), vec![1.0, 0.0]);
            entries.push(FileEntry::new(format!("f{i}.txt"), content));
        }
        let models = ModelContext::new(Box::new(TableEmbedder(table)), ModelSettings::default());
        let plan = Planner::new(&models, params(75))
            .plan(&entries, &[], &ExtensionMap::new())
            .unwrap();
        assert_eq!(plan.folders.len(), 1);
        assert!(matches!(&plan.folders[0].contents, FolderContents::Files(f) if f.len() == 8));
    }

    #[test]
    fn small_group_not_subdivided() {
        let (models, entries) = two_cluster_context();
        let plan = Planner::new(&models, params(50))
            .plan(&entries[..6], &[], &ExtensionMap::new())
            .unwrap();
        assert!(matches!(&plan.folders[0].contents, FolderContents::Files(f) if f.len() == 6));
    }

    #[test]
    fn ungrouped_member_stays_loose_in_subfolder() {
        let (mut table, mut entries) = two_clusters(3);
        // cos to the finance vector ~0.73: joins the top-level group, but
        // matches neither subgroup at 75%
        table.insert("scattered notes".to_string(), vec![1.0, -0.5]);
        entries.push(FileEntry::new("odd.txt", "scattered notes"));
        let models = ModelContext::new(Box::new(TableEmbedder(table)), ModelSettings::default());
        let plan = Planner::new(&models, params(50))
            .plan(&entries, &[], &ExtensionMap::new())
            .unwrap();

        assert_eq!(plan.folders.len(), 1);
        let FolderContents::Nested(sub) = &plan.folders[0].contents else {
            panic!("expected nested folder, got {:?}", plan.folders[0].contents);
        };
        assert_eq!(sub.folders.len(), 2);
        assert_eq!(sub.loose, vec!["odd.txt"]);
        assert!(!plan.misc.contains_key(UNGROUPED_CATEGORY));
        assert_eq!(names(&plan).len(), 7);
    }

    #[test]
    fn folder_names_avoid_sibling_files() {
        let models = hashing();
        let entries = vec![
            FileEntry::new("a.txt", "invoice invoice"),
            FileEntry::new("b.txt", "invoice invoice"),
        ];
        let plan = Planner::new(&models, params(50))
            .plan(&entries, &["Invoice".to_string()], &ExtensionMap::new())
            .unwrap();

        assert_eq!(plan.folders.len(), 1);
        assert_eq!(plan.folders[0].name, "Invoice_1");
        assert_eq!(plan.misc["no_extension"], vec!["Invoice"]);
    }

    #[test]
    fn names_unique_and_never_misc() {
        let models = hashing();
        let entries = vec![
            FileEntry::new("a.txt", "alpha beta"),
            FileEntry::new("b.txt", "alpha beta"),
            FileEntry::new("c.txt", "alpha beta"),
            FileEntry::new("d.txt", "gamma delta"),
            FileEntry::new("e.txt", "gamma delta"),
        ];
        let plan = Planner::new(&models, params(90))
            .plan(&entries, &[], &ExtensionMap::new())
            .unwrap();
        let keys = plan.keys();
        let unique: HashSet<&str> = keys.iter().copied().collect();
        assert_eq!(unique.len(), keys.len());
        assert!(plan.folders.iter().all(|f| f.name != MISC_FOLDER));
    }

    #[test]
    fn embedding_failure_propagates() {
        let models = ModelContext::new(Box::new(TableEmbedder(HashMap::new())), ModelSettings::default());
        let entries = vec![FileEntry::new("a.txt", "alpha")];
        let err = Planner::new(&models, params(50))
            .plan(&entries, &[], &ExtensionMap::new())
            .unwrap_err();
        assert!(matches!(err, FoldersError::Embedding(_)));
    }

    #[test]
    fn plan_json_roundtrip() {
        let (models, entries) = two_cluster_context();
        let plan = Planner::new(&models, params(50))
            .plan(&entries, &["x.bin".to_string()], &ExtensionMap::new())
            .unwrap();
        let json = serde_json::to_string(&plan).unwrap();
        let parsed: FolderPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, plan);
    }

    #[test]
    fn build_plan_missing_directory() {
        let models = hashing();
        let config = crate::config::embedded_default();
        let err = build_plan(Path::new("/no/such/folder"), &config, &models).unwrap_err();
        assert!(matches!(err, FoldersError::MissingDirectory(_)));
    }

    #[test]
    fn build_plan_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "alpha").unwrap();
        let err = build_plan(&file, &crate::config::embedded_default(), &hashing()).unwrap_err();
        assert!(matches!(err, FoldersError::NotADirectory(_)));
    }
}
