//! Error-location mapper (component I): turns a line number in the merged,
//! include-expanded buffer back into `(file, local line)`.

use crate::source::SourceMap;

/// Finds the map entry that covers `merged_line` and translates it back to
/// the originating file and local line number.
pub fn decode_location(map: &SourceMap, merged_line: u32) -> Option<(String, u32)> {
    map.iter()
        .rev()
        .find(|item| item.merged_line <= merged_line)
        .map(|item| {
            let local = item.local_line + (merged_line - item.merged_line);
            (item.file.clone(), local)
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::SourceMapItem;

    #[test]
    fn resolves_a_line_inside_an_included_file() {
        let map = vec![
            SourceMapItem { file: "root.s".into(), local_line: 1, merged_line: 1 },
            SourceMapItem { file: "sub.s".into(), local_line: 1, merged_line: 2 },
            SourceMapItem { file: "sub.s".into(), local_line: 2, merged_line: 3 },
            SourceMapItem { file: "root.s".into(), local_line: 2, merged_line: 4 },
        ];
        assert_eq!(decode_location(&map, 3), Some(("sub.s".to_string(), 2)));
        assert_eq!(decode_location(&map, 4), Some(("root.s".to_string(), 2)));
    }

    #[test]
    fn unknown_line_before_the_first_entry_is_none() {
        let map: SourceMap = vec![SourceMapItem { file: "root.s".into(), local_line: 1, merged_line: 1 }];
        assert_eq!(decode_location(&map, 0), None);
    }
}
