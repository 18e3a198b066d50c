use crate::csvio::CsvTable;

/// Replace a literal substring in every data field that contains it.
/// Used after images are moved between sibling folders (e.g.
/// `Images_To_Sort` → `Sorted_Images`). Returns the number of fields changed.
pub fn rewrite_paths(table: &mut CsvTable, from: &str, to: &str) -> usize {
    if from.is_empty() {
        return 0;
    }
    let mut changed = 0;
    for row in &mut table.rows {
        for field in row.iter_mut() {
            if field.contains(from) {
                *field = field.replace(from, to);
                changed += 1;
            }
        }
    }
    changed
}
