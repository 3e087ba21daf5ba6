#![cfg(feature = "plugin")]

use nu_plugin_folders::FoldersPlugin;
use nu_plugin_test_support::PluginTest;
use nu_protocol::{ShellError, Span, Value};

#[test]
fn misc_buckets_a_list_of_names() -> Result<(), ShellError> {
    let mut test = PluginTest::new("folders", FoldersPlugin.into())?;
    let value = test
        .eval(r#"["photo.jpg" "model.stl"] | folders misc"#)?
        .into_value(Span::test_data())?;

    let stl = value.get_data_by_key("stl").expect("stl bucket");
    assert_eq!(stl.as_list()?.len(), 1);
    Ok(())
}

#[test]
fn render_prints_tree() -> Result<(), ShellError> {
    let mut test = PluginTest::new("folders", FoldersPlugin.into())?;
    let value = test
        .eval(r#"{folders: [{name: Docs, contents: [a.txt]}]} | folders render --root top"#)?
        .into_value(Span::test_data())?;

    assert_eq!(value.as_str()?, "top\n└── Docs\n    └── a.txt\n");
    Ok(())
}

#[test]
fn plan_resolves_relative_path_from_shell_directory() -> Result<(), ShellError> {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha beta").unwrap();
    std::fs::write(dir.path().join("b.txt"), "alpha beta gamma").unwrap();
    std::fs::write(dir.path().join("c.jpg"), [0u8; 4]).unwrap();
    let shell_dir = dir.path().display().to_string();

    let mut test = PluginTest::new("folders", FoldersPlugin.into())?;
    test.engine_state_mut()
        .add_env_var("PWD".into(), Value::string(shell_dir.clone(), Span::test_data()));
    let value = test
        .eval("folders plan .")?
        .into_value(Span::test_data())?;

    let root = value.get_data_by_key("root").expect("root column");
    assert_eq!(root.as_str()?, shell_dir);
    let misc = value
        .get_data_by_key("plan")
        .and_then(|plan| plan.get_data_by_key("misc"))
        .expect("misc buckets");
    assert!(misc.get_data_by_key("images").is_some());
    // Planning leaves the files where they are
    assert!(dir.path().join("a.txt").is_file());
    Ok(())
}
