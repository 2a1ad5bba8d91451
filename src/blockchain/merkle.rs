use crate::crypto::digest;

/// Fold transaction ids into a Merkle root.
///
/// Adjacent ids are paired left to right and each pair `(a, b)` is replaced
/// by `digest(a ++ b)`. An odd level duplicates its last element. Returns
/// `None` for an empty list.
pub fn merkle_root<S: AsRef<str>>(ids: &[S]) -> Option<String> {
    if ids.is_empty() {
        return None;
    }

    let mut level: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();
    loop {
        if level.len() % 2 != 0 {
            let last = level[level.len() - 1].clone();
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| digest(format!("{}{}", pair[0], pair[1])))
            .collect();
        if level.len() == 1 {
            return level.pop();
        }
    }
}
