use rand::Rng;

use crate::models::Movie;

/// Rating assumed for movies whose rating is missing or unparseable
pub const DEFAULT_RATING: f64 = 6.0;

const GENRE_WEIGHT: f64 = 2.0;
const ACTOR_WEIGHT: f64 = 1.5;
const DIRECTOR_BONUS: f64 = 3.0;
const RATING_BONUS_SCALE: f64 = 0.5;

/// Affinity score between a candidate and the user's liked-movie set.
///
/// With no liked movies the score is a uniform draw from [0.5, 1.0) so an
/// unscored pool still shuffles into a non-degenerate order. Otherwise the
/// per-liked-movie contributions (shared genres, shared leading cast, same
/// director) are accumulated, normalized by the number of liked movies that
/// matched at all, topped up with a rating bonus, and multiplied by a random
/// jitter factor in [0.8, 1.2) so orderings vary across refreshes.
pub fn score(liked: &[Movie], candidate: &Movie, rng: &mut impl Rng) -> f64 {
    if liked.is_empty() {
        return rng.gen_range(0.5..1.0);
    }

    let cand_genres = candidate.genre_tokens();
    let cand_actors = candidate.cast_names();
    let cand_director = candidate.director_name();

    let mut total = 0.0;
    let mut match_count = 0u32;

    for liked_movie in liked {
        let liked_genres = liked_movie.genre_tokens();
        let liked_actors = liked_movie.cast_names();

        let genre_matches = cand_genres
            .iter()
            .filter(|g| liked_genres.contains(g))
            .count();
        total += genre_matches as f64 * GENRE_WEIGHT;

        let actor_matches = cand_actors
            .iter()
            .filter(|a| liked_actors.contains(a))
            .count();
        total += actor_matches as f64 * ACTOR_WEIGHT;

        let same_director =
            cand_director.is_some() && cand_director == liked_movie.director_name();
        if same_director {
            total += DIRECTOR_BONUS;
        }

        if genre_matches > 0 || actor_matches > 0 || same_director {
            match_count += 1;
        }
    }

    let normalized = if match_count > 0 {
        total / match_count as f64
    } else {
        0.0
    };
    let rating_bonus = (candidate.rating_or(DEFAULT_RATING) / 10.0) * RATING_BONUS_SCALE;
    let jitter = rng.gen_range(0.8..1.2);

    (normalized + rating_bonus) * jitter
}

/// The `n` most frequent non-blank genre tokens across the given movies,
/// ties broken by first appearance
pub fn top_genres(movies: &[Movie], n: usize) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();

    for movie in movies {
        for token in movie.genre_tokens() {
            match counts.iter_mut().find(|(name, _)| name == token) {
                Some((_, count)) => *count += 1,
                None => counts.push((token.to_string(), 1)),
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(n).map(|(name, _)| name).collect()
}

/// Mean release year over the movies with a parseable year
pub fn average_year(movies: &[Movie]) -> Option<i32> {
    let years: Vec<i32> = movies.iter().filter_map(|m| m.release_year()).collect();
    if years.is_empty() {
        return None;
    }
    Some((years.iter().map(|y| *y as f64).sum::<f64>() / years.len() as f64) as i32)
}
