//! Source reading with recursive `include` expansion (component B) and the
//! line map (component I's data) that lets errors be reported against the
//! original file rather than the merged buffer.

use std::fmt;
use std::path::Path;

/// The only way the assembler touches the outside world. Kept generic over
/// the loader's own error type so the core stays filesystem-agnostic —
/// a CLI driver supplies an implementation backed by `std::fs`, tests
/// supply one backed by an in-memory map.
pub trait SourceLoader {
    type Error: fmt::Display + fmt::Debug;

    fn load(&mut self, path: &str) -> Result<String, Self::Error>;
}

/// One emitted line's provenance: which file and local line it came from,
/// and which line of the merged buffer it landed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMapItem {
    pub file: String,
    pub local_line: u32,
    pub merged_line: u32,
}

pub type SourceMap = Vec<SourceMapItem>;

#[derive(Debug)]
pub struct MergedSource {
    pub text: String,
    pub map: SourceMap,
}

#[derive(Debug)]
pub enum ReadError<E> {
    Load { file: String, source: E },
    MalformedInclude { file: String, line: u32 },
}

impl<E: fmt::Display> fmt::Display for ReadError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReadError::Load { file, source } => write!(f, "{}: {}", file, source),
            ReadError::MalformedInclude { file, line } => {
                write!(f, "{}:{}: include with no path", file, line)
            }
        }
    }
}

/// Reads `root` through `loader`, recursively expanding `include <path>`
/// lines (resolved relative to the including file's directory), and
/// returns the merged buffer plus its line map.
pub fn read_with_includes<L: SourceLoader>(
    loader: &mut L,
    root: &str,
) -> Result<MergedSource, ReadError<L::Error>> {
    let mut text = String::new();
    let mut map = SourceMap::new();
    let mut merged_line = 1u32;
    read_file(loader, root, &mut text, &mut map, &mut merged_line)?;
    Ok(MergedSource { text, map })
}

fn read_file<L: SourceLoader>(
    loader: &mut L,
    path: &str,
    out: &mut String,
    map: &mut SourceMap,
    merged_line: &mut u32,
) -> Result<(), ReadError<L::Error>> {
    let contents = loader
        .load(path)
        .map_err(|source| ReadError::Load { file: path.to_string(), source })?;
    let dir = Path::new(path).parent().unwrap_or_else(|| Path::new(""));

    for (i, line) in contents.lines().enumerate() {
        let local_line = i as u32 + 1;
        let mut tokens = line.split_whitespace();
        if tokens.next() == Some("include") {
            let rest = tokens.next().ok_or_else(|| ReadError::MalformedInclude {
                file: path.to_string(),
                line: local_line,
            })?;
            let included = dir.join(rest);
            let included = included.to_string_lossy().into_owned();
            read_file(loader, &included, out, map, merged_line)?;
        } else {
            out.push_str(line);
            out.push('\n');
            map.push(SourceMapItem {
                file: path.to_string(),
                local_line,
                merged_line: *merged_line,
            });
            *merged_line += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    struct MapLoader(HashMap<&'static str, &'static str>);

    impl SourceLoader for MapLoader {
        type Error = String;

        fn load(&mut self, path: &str) -> Result<String, String> {
            self.0
                .get(path)
                .map(|s| s.to_string())
                .ok_or_else(|| format!("no such file: {}", path))
        }
    }

    #[test]
    fn expands_a_single_include() {
        let mut loader = MapLoader(
            vec![("root.s", "movv 0 1\ninclude sub.s\nhlt"), ("sub.s", "nop")]
                .into_iter()
                .collect(),
        );
        let merged = read_with_includes(&mut loader, "root.s").unwrap();
        assert_eq!(merged.text, "movv 0 1\nnop\nhlt\n");
        assert_eq!(merged.map[0].file, "root.s");
        assert_eq!(merged.map[1].file, "sub.s");
        assert_eq!(merged.map[1].local_line, 1);
        assert_eq!(merged.map[2].file, "root.s");
        assert_eq!(merged.map[2].local_line, 3);
    }

    #[test]
    fn missing_include_target_is_reported() {
        let mut loader = MapLoader(vec![("root.s", "include missing.s")].into_iter().collect());
        let err = read_with_includes(&mut loader, "root.s").unwrap_err();
        assert!(matches::matches!(err, ReadError::Load { .. }));
    }

    #[test]
    fn nested_includes_resolve_relative_to_their_own_directory() {
        let mut loader = MapLoader(
            vec![
                ("a/root.s", "include b/mid.s"),
                ("a/b/mid.s", "include leaf.s"),
                ("a/b/leaf.s", "hlt"),
            ]
            .into_iter()
            .collect(),
        );
        let merged = read_with_includes(&mut loader, "a/root.s").unwrap();
        assert_eq!(merged.text, "hlt\n");
    }
}
