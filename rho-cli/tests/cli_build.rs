use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn rho(root: &Path) -> Result<Command, Box<dyn std::error::Error>> {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("rho")?;
    cmd.current_dir(root);
    Ok(cmd)
}

/// Small site: a home page, one post with an image, a tag index and a feed
fn scaffold(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    write(
        root,
        "rho.yml",
        r#"
site:
  title: "Test Site"
  author: "Tester"
"#,
    )?;
    write(
        root,
        "layouts/default.html",
        "<html><title>{{ header_title }}</title>{% include 'nav' %}{{ body }}</html>",
    )?;
    write(
        root,
        "layouts/markdown.html",
        "<article><h1>{{ title }}</h1>{{ body }}</article>",
    )?;
    write(root, "partials/nav.html", "<nav>{{ site.title }}</nav>")?;
    write(root, "static/robots.txt", "User-agent: *")?;

    write(
        root,
        "content/index.html",
        "<ul>{% for p in posts %}<li><a href=\"/{{ p.url }}\">{{ p.frontmatter.title }}</a></li>{% endfor %}</ul>",
    )?;
    write(root, "content/index.html.rho.toml", "posts = true\n")?;
    write(
        root,
        "content/posts/2020/hello/hello.md",
        "+++\ntitle = 'Hello'\nauthor = 'Tester'\ndate = 2020-03-14\ntags = ['rust', 'Home Lab']\n+++\n# Hi\n\n![diagram](diagram.svg)\n",
    )?;
    write(root, "content/posts/2020/hello/diagram.svg", "<svg/>")?;
    write(
        root,
        "content/tag/tag.html",
        "<h2>{{ term }} ({{ count }})</h2>",
    )?;
    write(
        root,
        "content/tag/tag.html.rho.toml",
        "[header]\ntitle = 'Tags'\n\n[routes]\ntaxonomy = 'tags'\n",
    )?;
    write(
        root,
        "content/feed/feed.xml",
        "<rss>{% for p in posts %}<item>{{ p.slug }}</item>{% endfor %}</rss>",
    )?;
    write(root, "content/feed/feed.xml.rho.toml", "posts = true\n")?;
    write(root, "content/_drafts.css", "hidden")?;
    Ok(())
}

#[test]
fn build_renders_the_site() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    scaffold(dir.path())?;

    rho(dir.path())?.arg("build").assert().success();

    let build = dir.path().join("build");
    let home = fs::read_to_string(build.join("index.html"))?;
    assert!(home.contains("<title>Test Site</title>"));
    assert!(home.contains("<nav>Test Site</nav>"));
    assert!(home.contains(r#"<a href="/posts/hello/index.html">Hello</a>"#));

    let post = fs::read_to_string(build.join("posts/hello/index.html"))?;
    assert!(post.contains("<article><h1>Hello</h1>"));
    assert!(post.contains(r#"<img src="diagram.svg" alt="diagram" />"#));
    assert_eq!(
        fs::read_to_string(build.join("posts/hello/diagram.svg"))?,
        "<svg/>"
    );

    let rust = fs::read_to_string(build.join("tag/rust/index.html"))?;
    assert!(rust.contains("<title>Tags</title>"));
    assert!(rust.contains("<h2>rust (1)</h2>"));
    assert!(build.join("tag/home-lab/index.html").exists());

    assert_eq!(
        fs::read_to_string(build.join("feed/feed.xml"))?,
        "<rss><item>hello</item></rss>"
    );
    assert_eq!(
        fs::read_to_string(build.join("robots.txt"))?,
        "User-agent: *"
    );
    assert!(!build.join("_drafts.css").exists());
    assert!(!build.join("index.html.rho.toml").exists());
    assert!(dir.path().join(".cache/cache.json").exists());
    Ok(())
}

#[test]
fn second_build_uses_cache() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    scaffold(dir.path())?;

    rho(dir.path())?.arg("build").assert().success();
    rho(dir.path())?
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 0 pages"));

    rho(dir.path())?
        .args(["build", "--no-cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered 0 pages").not());
    Ok(())
}

#[test]
fn clean_build_removes_stale_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    scaffold(dir.path())?;
    write(dir.path(), "build/stale.html", "old")?;

    rho(dir.path())?.args(["build", "--clean"]).assert().success();
    assert!(!dir.path().join("build/stale.html").exists());
    assert!(dir.path().join("build/index.html").exists());
    Ok(())
}

#[test]
fn build_fails_on_missing_required_field() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    scaffold(dir.path())?;
    write(
        dir.path(),
        "content/posts/2021/broken/broken.md",
        "+++\ntitle = 'Broken'\nauthor = 'Tester'\n+++\nbody\n",
    )?;

    rho(dir.path())?
        .arg("build")
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"date\""))
        .stderr(predicate::str::contains("failed to build"));

    assert!(dir.path().join("build/posts/hello/index.html").exists());
    Ok(())
}

#[test]
fn orphaned_logic_module_aborts() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    scaffold(dir.path())?;
    write(dir.path(), "content/tag/other.html.rho.toml", "posts = true\n")?;

    rho(dir.path())?
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Build aborted"));
    Ok(())
}

#[test]
fn check_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    scaffold(dir.path())?;

    rho(dir.path())?
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("files OK"));
    assert!(!dir.path().join("build").exists());
    assert!(!dir.path().join(".cache/cache.json").exists());
    Ok(())
}

#[test]
fn new_creates_draft_post() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    scaffold(dir.path())?;

    rho(dir.path())?
        .args(["new", "My First Post", "--title", "My First Post"])
        .assert()
        .success();

    let path = dir
        .path()
        .join("content/posts/drafts/my-first-post/my-first-post.md");
    let text = fs::read_to_string(&path)?;
    assert!(text.starts_with("+++\ntitle = "));
    assert!(text.contains("My First Post"));
    assert!(text.contains("Tester"));
    assert!(text.contains("draft = true"));

    rho(dir.path())?
        .args(["new", "my-first-post"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    // Drafts stay out of the build
    rho(dir.path())?.arg("build").assert().success();
    assert!(!dir.path().join("build/posts/my-first-post").exists());
    Ok(())
}

#[test]
fn help_lists_commands() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    rho(dir.path())?
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("build")
                .and(predicate::str::contains("watch"))
                .and(predicate::str::contains("serve"))
                .and(predicate::str::contains("check"))
                .and(predicate::str::contains("new")),
        );
    Ok(())
}
