//! Text preview of a [`FolderPlan`].

use crate::algo::misc::MISC_FOLDER;
use crate::plan::{FolderContents, FolderPlan};

const BRANCH: &str = "│   ";
const CONNECTOR: &str = "├── ";
const END: &str = "└── ";
const SPACE: &str = "    ";

enum Node<'a> {
    Dir(&'a str, Vec<Node<'a>>),
    File(&'a str),
}

/// Render `plan` below a `root_name` line, one line per folder and file.
pub fn render(root_name: &str, plan: &FolderPlan) -> String {
    let mut out = String::new();
    out.push_str(root_name);
    out.push('\n');
    write_nodes(&plan_nodes(plan), "", &mut out);
    out
}

fn plan_nodes(plan: &FolderPlan) -> Vec<Node<'_>> {
    let mut nodes: Vec<Node> = plan
        .folders
        .iter()
        .map(|folder| {
            let children = match &folder.contents {
                FolderContents::Files(files) => files.iter().map(|f| Node::File(f)).collect(),
                FolderContents::Nested(sub) => plan_nodes(sub),
            };
            Node::Dir(&folder.name, children)
        })
        .collect();

    nodes.extend(plan.loose.iter().map(|f| Node::File(f)));

    if !plan.misc.is_empty() {
        let categories = plan
            .misc
            .iter()
            .map(|(category, files)| Node::Dir(category, files.iter().map(|f| Node::File(f)).collect()))
            .collect();
        nodes.push(Node::Dir(MISC_FOLDER, categories));
    }
    nodes
}

fn write_nodes(nodes: &[Node], indent: &str, out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let pointer = if last { END } else { CONNECTOR };
        match node {
            Node::File(name) => {
                out.push_str(&format!("{indent}{pointer}{name}\n"));
            }
            Node::Dir(name, children) => {
                out.push_str(&format!("{indent}{pointer}{name}\n"));
                let next = format!("{indent}{}", if last { SPACE } else { BRANCH });
                write_nodes(children, &next, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::misc::MiscBuckets;
    use crate::plan::Folder;

    fn files(names: &[&str]) -> FolderContents {
        FolderContents::Files(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn empty_plan_is_root_only() {
        assert_eq!(render("docs", &FolderPlan::default()), "docs\n");
    }

    #[test]
    fn flat_plan_with_misc() {
        let mut misc = MiscBuckets::new();
        misc.insert("jpg".into(), vec!["c.jpg".into()]);
        let plan = FolderPlan {
            folders: vec![Folder {
                name: "Alpha_Beta".into(),
                contents: files(&["a.txt", "b.txt"]),
            }],
            loose: vec![],
            misc,
        };
        let expected = "\
docs
├── Alpha_Beta
│   ├── a.txt
│   └── b.txt
└── _misc
    └── jpg
        └── c.jpg
";
        assert_eq!(render("docs", &plan), expected);
    }

    #[test]
    fn nested_plan_with_loose_files() {
        let sub = FolderPlan {
            folders: vec![
                Folder {
                    name: "Budget".into(),
                    contents: files(&["1.txt", "2.txt"]),
                },
                Folder {
                    name: "Recipe".into(),
                    contents: files(&["3.txt", "4.txt"]),
                },
            ],
            loose: vec!["5.txt".into()],
            misc: MiscBuckets::new(),
        };
        let plan = FolderPlan {
            folders: vec![Folder {
                name: "Mixed".into(),
                contents: FolderContents::Nested(sub),
            }],
            loose: vec![],
            misc: MiscBuckets::new(),
        };
        let expected = "\
root
└── Mixed
    ├── Budget
    │   ├── 1.txt
    │   └── 2.txt
    ├── Recipe
    │   ├── 3.txt
    │   └── 4.txt
    └── 5.txt
";
        assert_eq!(render("root", &plan), expected);
    }
}
