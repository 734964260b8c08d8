use std::{sync::Arc, thread};

use camino::Utf8PathBuf;
use indoc::indoc;
use resconf::{
    director::{self, DIRECTOR, JOB, POOL},
    engine::Engine,
    lexer::ParseError,
};

/// A fresh scratch directory for one test
fn scratch(name: &str) -> Utf8PathBuf {
    let dir = std::env::temp_dir().join(format!("resconf-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    Utf8PathBuf::from_path_buf(dir).unwrap()
}

#[test]
fn failed_reload_keeps_serving_the_old_configuration() -> anyhow::Result<()> {
    let mut engine = Engine::new(&director::SCHEMA)?;
    engine.parse_str(
        "bareos-dir.conf",
        "Director { Name = dir; Password = p }\nPool { Name = X; Maximum Volumes = 7 }\n",
    )?;
    let registry = engine.registry();

    let error = engine
        .parse_str(
            "bareos-dir.conf",
            indoc!(
                "
                Director { Name = dir; Password = p }
                Pool { Name = X; Maximum Volumes = 8 }
                Pool { Name = Y
                "
            ),
        )
        .unwrap_err();
    let error = error.downcast::<ParseError>().unwrap();
    assert_eq!(error.message(), "End of conf file reached with unclosed resource.");
    assert_eq!(engine.errors().len(), 1);

    let pool = registry.get_by_name(POOL, "X").unwrap();
    assert_eq!(pool.get_int("Maximum Volumes"), Some(7));
    assert!(registry.get_by_name(POOL, "Y").is_none());
    Ok(())
}

#[test]
fn readers_see_whole_snapshots_during_reloads() -> anyhow::Result<()> {
    let mut engine = Engine::new(&director::SCHEMA)?;
    let generation = |n: usize| {
        let mut text = String::from("Director { Name = dir; Password = p }\n");
        for i in 0..20 {
            text += &format!("Pool {{ Name = pool{i}; Maximum Volumes = {n} }}\n");
        }
        text
    };
    engine.parse_str("bareos-dir.conf", &generation(0))?;
    let registry = engine.registry();

    let reader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..200 {
                let snapshot = registry.snapshot();
                let volumes: Vec<_> = snapshot
                    .chain(POOL)
                    .iter()
                    .map(|pool| pool.get_int("Maximum Volumes"))
                    .collect();
                assert_eq!(volumes.len(), 20);
                assert!(volumes.windows(2).all(|w| w[0] == w[1]), "{volumes:?}");
            }
        })
    };
    for n in 1..20 {
        engine.parse_str("bareos-dir.conf", &generation(n))?;
    }
    reader.join().unwrap();
    assert_eq!(
        registry.get_by_name(POOL, "pool3").unwrap().get_int("Maximum Volumes"),
        Some(19)
    );
    Ok(())
}

#[test]
fn includes_and_wildcards() -> anyhow::Result<()> {
    let dir = scratch("includes");
    std::fs::create_dir_all(dir.join("pools"))?;
    std::fs::write(
        dir.join("bareos-dir.conf"),
        indoc!(
            "
            Director {
              Name = dir
              @secret.inc
            }
            @pools/*.conf
            Job { Name = j; Type = Backup; Pool = Full }
            "
        ),
    )?;
    std::fs::write(dir.join("secret.inc"), "Password = \"from include\"\n")?;
    std::fs::write(dir.join("pools/full.conf"), "Pool { Name = Full }\n")?;
    std::fs::write(dir.join("pools/incr.conf"), "Pool { Name = Incr }\n")?;

    let mut engine = Engine::new(&director::SCHEMA)?;
    engine.parse(dir.join("bareos-dir.conf"))?;
    let director = engine.get_by_name(DIRECTOR, "dir").unwrap();
    assert_eq!(director.get_password("Password").unwrap().value, "from include");
    let names: Vec<_> = engine
        .snapshot()
        .chain(POOL)
        .iter()
        .filter_map(|pool| pool.name().map(str::to_owned))
        .collect();
    assert_eq!(names, ["Full", "Incr"]);
    assert!(engine
        .get_by_name(JOB, "j")
        .unwrap()
        .get_reference("Pool")
        .unwrap()
        .is_resolved());
    Ok(())
}

#[test]
fn errors_in_included_files_name_the_include_site() -> anyhow::Result<()> {
    let dir = scratch("include-errors");
    std::fs::write(dir.join("bareos-dir.conf"), "Director {\n  Name = dir\n  @bad.inc\n}\n")?;
    std::fs::write(dir.join("bad.inc"), "Password p\n")?;

    let mut engine = Engine::new(&director::SCHEMA)?;
    let error = engine.parse(dir.join("bareos-dir.conf")).unwrap_err();
    let error = error.downcast::<ParseError>().unwrap();
    assert_eq!(error.message(), "expected an equals, got: p");
    assert!(error.file().ends_with("bad.inc"), "{}", error.file());
    let site = error.next().unwrap();
    assert!(site.file().ends_with("bareos-dir.conf"));
    assert_eq!(site.line_number(), 3);
    Ok(())
}

#[test]
fn configuration_directory_with_include_tree() -> anyhow::Result<()> {
    let dir = scratch("include-tree");
    for (group, name, text) in [
        ("director", "dir.conf", "Director { Name = dir; Password = p }\n"),
        ("pool", "Full.conf", "Pool { Name = Full }\n"),
        ("job", "Nightly.conf", "Job { Name = Nightly; Type = Backup; Pool = Full }\n"),
    ] {
        let group = dir.join(director::INCLUDE_DIR).join(group);
        std::fs::create_dir_all(&group)?;
        std::fs::write(group.join(name), text)?;
    }
    let mut engine = Engine::new(&director::SCHEMA)?
        .with_default_filename(director::DEFAULT_FILENAME)
        .with_include_dir(director::INCLUDE_DIR);
    director::install_checks(&mut engine);
    engine.parse(&dir)?;
    assert_eq!(engine.snapshot().len(), 3);
    assert!(engine.unresolved().is_empty());
    Ok(())
}
