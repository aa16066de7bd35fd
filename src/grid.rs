//! Puzzle-grid generation
//!
//! Places a word list onto a square letter grid by random trial. Placement
//! is best-effort: a word that cannot be placed is dropped, but the result
//! reports exactly which words landed so callers can surface the rest.

use rand::Rng;

/// Default grid edge length.
pub const DEFAULT_GRID_SIZE: usize = 8;

/// Random placement attempts per word before giving up.
const PLACEMENT_ATTEMPTS: usize = 200;

/// 4 axis directions plus 4 diagonals.
const DIRECTIONS: [(i32, i32); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Result of a grid build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridBuild {
    /// `size` rows of `size` uppercase letters.
    pub grid: Vec<Vec<char>>,
    /// Normalized words that were placed, in input order.
    pub placed: Vec<String>,
    /// Normalized words that exhausted their placement attempts.
    pub dropped: Vec<String>,
}

/// Build a letter grid containing as many of `words` as will fit.
///
/// Each word is whitespace-stripped and uppercased, then tried up to 200
/// times at a random start cell and direction. A placement is accepted iff
/// every cell on the path is empty or already holds the same letter.
/// Remaining empty cells are filled with uniformly random letters.
///
/// Output is random per call; every placed word is guaranteed findable
/// along a straight line in one of the eight directions.
pub fn build_grid(words: &[String], size: usize) -> GridBuild {
    let mut rng = rand::thread_rng();
    let mut grid: Vec<Vec<Option<char>>> = vec![vec![None; size]; size];
    let mut placed = Vec::new();
    let mut dropped = Vec::new();

    for raw in words {
        let word: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        if word.is_empty() {
            continue;
        }
        let letters: Vec<char> = word.chars().collect();

        if try_place(&mut grid, &letters, size, &mut rng) {
            placed.push(word);
        } else {
            dropped.push(word);
        }
    }

    let grid = grid
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| cell.unwrap_or_else(|| (b'A' + rng.gen_range(0..26u8)) as char))
                .collect()
        })
        .collect();

    GridBuild {
        grid,
        placed,
        dropped,
    }
}

fn try_place(
    grid: &mut [Vec<Option<char>>],
    letters: &[char],
    size: usize,
    rng: &mut impl Rng,
) -> bool {
    let span = letters.len() as i32 - 1;

    for _ in 0..PLACEMENT_ATTEMPTS {
        let (dr, dc) = DIRECTIONS[rng.gen_range(0..DIRECTIONS.len())];
        let start_r = rng.gen_range(0..size) as i32;
        let start_c = rng.gen_range(0..size) as i32;
        let end_r = start_r + dr * span;
        let end_c = start_c + dc * span;
        if end_r < 0 || end_r >= size as i32 || end_c < 0 || end_c >= size as i32 {
            continue;
        }

        let cells = (0..letters.len()).map(|i| {
            (
                (start_r + dr * i as i32) as usize,
                (start_c + dc * i as i32) as usize,
            )
        });

        // Overlap is allowed only on identical letters.
        let compatible = cells
            .clone()
            .zip(letters)
            .all(|((r, c), &l)| grid[r][c].is_none_or(|held| held == l));
        if !compatible {
            continue;
        }

        for ((r, c), &l) in cells.zip(letters) {
            grid[r][c] = Some(l);
        }
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scan the grid for `word` along a straight line in any direction.
    fn find_word(grid: &[Vec<char>], word: &str) -> bool {
        let size = grid.len() as i32;
        let letters: Vec<char> = word.chars().collect();
        let span = letters.len() as i32 - 1;

        for start_r in 0..size {
            for start_c in 0..size {
                for (dr, dc) in DIRECTIONS {
                    let end_r = start_r + dr * span;
                    let end_c = start_c + dc * span;
                    if end_r < 0 || end_r >= size || end_c < 0 || end_c >= size {
                        continue;
                    }
                    let hit = letters.iter().enumerate().all(|(i, &l)| {
                        let r = (start_r + dr * i as i32) as usize;
                        let c = (start_c + dc * i as i32) as usize;
                        grid[r][c] == l
                    });
                    if hit {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn placed_words_are_findable() {
        let input = words(&["cat", "river", "dog", "planet", "mouse"]);
        for _ in 0..20 {
            let build = build_grid(&input, DEFAULT_GRID_SIZE);
            for word in &build.placed {
                assert!(
                    find_word(&build.grid, word),
                    "placed word {word} not findable in grid"
                );
            }
        }
    }

    #[test]
    fn every_cell_holds_an_uppercase_letter() {
        let build = build_grid(&words(&["cat"]), DEFAULT_GRID_SIZE);
        assert_eq!(build.grid.len(), DEFAULT_GRID_SIZE);
        for row in &build.grid {
            assert_eq!(row.len(), DEFAULT_GRID_SIZE);
            for &cell in row {
                assert!(cell.is_ascii_uppercase());
            }
        }
    }

    #[test]
    fn words_are_normalized_before_placement() {
        let build = build_grid(&words(&["  ca t "]), DEFAULT_GRID_SIZE);
        assert_eq!(build.placed, vec!["CAT".to_string()]);
        assert!(find_word(&build.grid, "CAT"));
    }

    #[test]
    fn oversized_word_is_dropped_not_lost() {
        let build = build_grid(&words(&["unplaceablylongword", "cat"]), 8);
        assert_eq!(build.dropped, vec!["UNPLACEABLYLONGWORD".to_string()]);
        assert_eq!(build.placed, vec!["CAT".to_string()]);
    }

    #[test]
    fn blank_words_are_skipped_entirely() {
        let build = build_grid(&words(&["   ", ""]), DEFAULT_GRID_SIZE);
        assert!(build.placed.is_empty());
        assert!(build.dropped.is_empty());
    }

    #[test]
    fn accepts_a_full_load_of_words() {
        let input = words(&["ant", "bee", "cow", "doe", "elk", "fox", "gnu", "hen"]);
        let build = build_grid(&input, DEFAULT_GRID_SIZE);
        // Short words on an 8x8 grid essentially always place.
        assert!(build.placed.len() >= input.len() - 1);
        for word in &build.placed {
            assert!(find_word(&build.grid, word));
        }
    }
}
