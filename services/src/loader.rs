use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use aos_core::LoadError;
use aos_core::capability::DirectiveLoader;
use tracing::debug;

const BLUEPRINT_EXTENSION: &str = "lua";

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return PathBuf::from(path);
    };
    if path == "~" {
        return home;
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Everything after the directive word, trimmed.
fn directive_argument(line: &str) -> Option<&str> {
    line.trim()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty())
}

/// Serves `.load <file>`.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    base_dir: Option<PathBuf>,
}

impl FileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative paths against `dir` instead of the working
    /// directory.
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn resolve(&self, argument: &str) -> PathBuf {
        let path = expand_home(argument);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

impl DirectiveLoader for FileLoader {
    fn expand(&self, directive: &str) -> Result<String, LoadError> {
        let argument =
            directive_argument(directive).ok_or_else(|| LoadError::new("Usage: .load <file>"))?;
        let path = self.resolve(argument);
        debug!(path = %path.display(), "loading file");
        read_source(&path, argument)
    }
}

/// Serves `.load-blueprint <name>` from a directory of `.lua` files.
#[derive(Debug, Clone)]
pub struct BlueprintLoader {
    dir: PathBuf,
}

impl BlueprintLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, LoadError> {
        let stem = name.strip_suffix(".lua").unwrap_or(name);
        let mut components = Path::new(stem).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(LoadError::new(format!(
                    "ERROR: invalid blueprint name {name}."
                )));
            }
        }
        Ok(self.dir.join(format!("{stem}.{BLUEPRINT_EXTENSION}")))
    }
}

impl DirectiveLoader for BlueprintLoader {
    fn expand(&self, directive: &str) -> Result<String, LoadError> {
        let name = directive_argument(directive)
            .ok_or_else(|| LoadError::new("Usage: .load-blueprint <name>"))?;
        let path = self.path_for(name)?;
        debug!(path = %path.display(), "loading blueprint");
        if !path.is_file() {
            return Err(LoadError::new(format!("ERROR: blueprint {name} not found.")));
        }
        read_source(&path, name)
    }
}

fn read_source(path: &Path, shown_as: &str) -> Result<String, LoadError> {
    match std::fs::read_to_string(path) {
        Ok(code) => Ok(code),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(LoadError::new(format!(
            "ERROR: {shown_as} file not found."
        ))),
        Err(err) => Err(LoadError::new(format!(
            "ERROR: could not read {shown_as}: {err}"
        ))),
    }
}

/// Blueprint files in `dir`, sorted by name.
pub fn list_blueprints(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_blueprint = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == BLUEPRINT_EXTENSION);
        if is_blueprint {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Copies every blueprint in `src` into `dest`, creating `dest` if needed.
/// Returns the paths written.
pub fn export_blueprints(src: &Path, dest: &Path) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dest)?;
    let mut written = Vec::new();
    for blueprint in list_blueprints(src)? {
        let Some(file_name) = blueprint.file_name() else {
            continue;
        };
        let target = dest.join(file_name);
        std::fs::copy(&blueprint, &target)?;
        written.push(target);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn blueprints() -> (TempDir, BlueprintLoader) {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("chat.lua"), "Chat = {}\n").expect("write");
        std::fs::write(dir.path().join("token.lua"), "Token = {}\n").expect("write");
        std::fs::write(dir.path().join("README.md"), "not a blueprint").expect("write");
        let loader = BlueprintLoader::new(dir.path());
        (dir, loader)
    }

    #[test]
    fn file_load_reads_relative_to_base() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("main.lua"), "print('hi')").expect("write");
        let loader = FileLoader::with_base_dir(dir.path());

        assert_eq!(
            loader.expand(".load main.lua").expect("loaded"),
            "print('hi')"
        );
    }

    #[test]
    fn file_load_without_argument_prints_usage() {
        let loader = FileLoader::new();
        for line in [".load", ".load   "] {
            assert_eq!(
                loader.expand(line).expect_err("usage").message(),
                "Usage: .load <file>"
            );
        }
    }

    #[test]
    fn missing_file_is_reported_as_typed() {
        let dir = TempDir::new().expect("tempdir");
        let loader = FileLoader::with_base_dir(dir.path());
        assert_eq!(
            loader.expand(".load foo.code").expect_err("missing").message(),
            "ERROR: foo.code file not found."
        );
    }

    #[test]
    fn argument_keeps_inner_spaces() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("my file.lua"), "x = 1").expect("write");
        let loader = FileLoader::with_base_dir(dir.path());
        assert_eq!(loader.expand(".load  my file.lua ").expect("loaded"), "x = 1");
    }

    #[test]
    fn tilde_expands_to_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_home("~/x.lua"), home.join("x.lua"));
        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("a/~/b"), PathBuf::from("a/~/b"));
    }

    #[test]
    fn blueprint_suffix_is_optional() {
        let (_dir, loader) = blueprints();
        assert_eq!(
            loader.expand(".load-blueprint chat").expect("chat"),
            "Chat = {}\n"
        );
        assert_eq!(
            loader.expand(".load-blueprint chat.lua").expect("chat"),
            "Chat = {}\n"
        );
    }

    #[test]
    fn blueprint_errors() {
        let (_dir, loader) = blueprints();
        assert_eq!(
            loader.expand(".load-blueprint").expect_err("usage").message(),
            "Usage: .load-blueprint <name>"
        );
        assert_eq!(
            loader
                .expand(".load-blueprint nope")
                .expect_err("missing")
                .message(),
            "ERROR: blueprint nope not found."
        );
        assert_eq!(
            loader
                .expand(".load-blueprint ../secret")
                .expect_err("escape")
                .message(),
            "ERROR: invalid blueprint name ../secret."
        );
    }

    #[test]
    fn export_copies_only_blueprints() {
        let (src, _loader) = blueprints();
        let dest = TempDir::new().expect("tempdir");
        let target = dest.path().join("out");

        let written = export_blueprints(src.path(), &target).expect("export");

        assert_eq!(
            written,
            vec![target.join("chat.lua"), target.join("token.lua")]
        );
        assert_eq!(
            std::fs::read_to_string(target.join("token.lua")).expect("read"),
            "Token = {}\n"
        );
        assert!(!target.join("README.md").exists());
    }
}
