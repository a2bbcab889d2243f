//! Catalog records.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::data::filters::{Filters, Metadata};
use crate::data::{DataError, OptimisticStore};
use crate::storage::{Engine, Record};
use crate::validation::{unique_values, Validator};

/// Running time in minutes, rendered as `"<n> mins"` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Runtime(pub i32);

impl Runtime {
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for Runtime {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const INVALID: &str = "invalid runtime format";
        match s.split(' ').collect::<Vec<_>>().as_slice() {
            [minutes, "mins"] => minutes.parse().map(Runtime).map_err(|_| INVALID),
            _ => Err(INVALID),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    pub id: i64,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub year: i32,
    #[serde(skip_serializing_if = "Runtime::is_zero")]
    pub runtime: Runtime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    pub version: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl Movie {
    /// A movie not yet stored.
    pub fn new(title: String, year: i32, runtime: Runtime, genres: Vec<String>) -> Self {
        Self {
            id: 0,
            created_at: Utc::now(),
            title,
            year,
            runtime,
            genres,
            version: 0,
        }
    }
}

impl Record for Movie {
    fn id(&self) -> i64 {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
    fn version(&self) -> i32 {
        self.version
    }
    fn set_version(&mut self, version: i32) {
        self.version = version;
    }
}

pub fn validate_movie(v: &mut Validator, movie: &Movie) {
    v.check(!movie.title.is_empty(), "title", "must be provided");
    v.check(
        movie.title.len() <= 500,
        "title",
        "must not be more than 500 bytes long",
    );

    v.check(movie.year != 0, "year", "must be provided");
    v.check(movie.year >= 1888, "year", "must be greater than 1888");
    v.check(
        movie.year <= Utc::now().year(),
        "year",
        "must not be in the future",
    );

    v.check(!movie.runtime.is_zero(), "runtime", "must be provided");
    v.check(movie.runtime.0 > 0, "runtime", "must be a positive integer");

    v.check(!movie.genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        movie.genres.len() <= 5,
        "genres",
        "must not contain more than 5 genres",
    );
    v.check(
        unique_values(&movie.genres),
        "genres",
        "must not contain duplicate values",
    );
}

pub const SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];

#[derive(Clone)]
pub struct MovieModel {
    store: OptimisticStore<Movie>,
}

impl MovieModel {
    pub fn new(engine: &Engine, timeout: Duration) -> Self {
        Self {
            store: OptimisticStore::new(engine, timeout, "movies"),
        }
    }

    pub async fn insert(&self, movie: Movie) -> Result<Movie, DataError> {
        self.store.insert(movie).await
    }

    pub async fn get(&self, id: i64) -> Result<Movie, DataError> {
        self.store.get(id).await
    }

    pub async fn update(&self, movie: &mut Movie) -> Result<(), DataError> {
        self.store.update(movie).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), DataError> {
        self.store.delete(id).await
    }

    /// Movies whose title contains every word of `title` (case-insensitive)
    /// and whose genres include all of `genres`; either filter is skipped
    /// when empty.
    pub async fn get_all(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Movie>, Metadata), DataError> {
        let words: Vec<String> = title.split_whitespace().map(str::to_lowercase).collect();

        let mut movies = self
            .store
            .scan(|movie| matches_title(movie, &words) && genres.iter().all(|g| movie.genres.contains(g)))
            .await?;

        let column = filters.sort_column().to_string();
        let descending = filters.descending();
        movies.sort_by(|a, b| {
            let primary = compare_by(&column, a, b);
            let primary = if descending { primary.reverse() } else { primary };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        let total = movies.len() as i64;
        let page: Vec<Movie> = movies
            .into_iter()
            .skip(filters.offset())
            .take(filters.limit())
            .collect();

        Ok((page, Metadata::calculate(total, filters.page, filters.page_size)))
    }
}

fn matches_title(movie: &Movie, words: &[String]) -> bool {
    if words.is_empty() {
        return true;
    }
    let title = movie.title.to_lowercase();
    let title_words: Vec<&str> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    words.iter().all(|w| title_words.contains(&w.as_str()))
}

fn compare_by(column: &str, a: &Movie, b: &Movie) -> Ordering {
    match column {
        "title" => a.title.cmp(&b.title),
        "year" => a.year.cmp(&b.year),
        "runtime" => a.runtime.cmp(&b.runtime),
        _ => a.id.cmp(&b.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(title: &str, year: i32, genres: &[&str]) -> Movie {
        Movie::new(
            title.to_string(),
            year,
            Runtime(100),
            genres.iter().map(|g| g.to_string()).collect(),
        )
    }

    fn filters(sort: &str) -> Filters {
        Filters {
            page: 1,
            page_size: 20,
            sort: sort.to_string(),
            sort_safelist: SORT_SAFELIST,
        }
    }

    #[test]
    fn runtime_wire_format() {
        assert_eq!(serde_json::to_string(&Runtime(102)).unwrap(), "\"102 mins\"");
        let parsed: Runtime = serde_json::from_str("\"95 mins\"").unwrap();
        assert_eq!(parsed, Runtime(95));
        assert!(serde_json::from_str::<Runtime>("\"95 minutes\"").is_err());
        assert!(serde_json::from_str::<Runtime>("95").is_err());
    }

    #[test]
    fn serialization_hides_created_at_and_empty_fields() {
        let mut m = movie("Casablanca", 0, &[]);
        m.runtime = Runtime(0);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json, serde_json::json!({"id": 0, "title": "Casablanca", "version": 0}));
    }

    #[test]
    fn validation_messages() {
        let mut v = Validator::new();
        let mut m = movie("", 1700, &["drama", "drama"]);
        m.runtime = Runtime(-3);
        validate_movie(&mut v, &m);
        let errors = v.errors();
        assert_eq!(errors["title"], "must be provided");
        assert_eq!(errors["year"], "must be greater than 1888");
        assert_eq!(errors["runtime"], "must be a positive integer");
        assert_eq!(errors["genres"], "must not contain duplicate values");
    }

    #[tokio::test]
    async fn list_filters_and_sorts() {
        let model = MovieModel::new(&Engine::new(), Duration::from_secs(3));
        model.insert(movie("The Breakfast Club", 1985, &["comedy", "drama"])).await.unwrap();
        model.insert(movie("Black Panther", 2018, &["action", "adventure"])).await.unwrap();
        model.insert(movie("Deadpool", 2016, &["action", "comedy"])).await.unwrap();

        let (all, meta) = model.get_all("", &[], &filters("-year")).await.unwrap();
        let titles: Vec<_> = all.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Black Panther", "Deadpool", "The Breakfast Club"]);
        assert_eq!(meta.total_records, 3);

        let (comedies, _) = model
            .get_all("", &["comedy".to_string()], &filters("id"))
            .await
            .unwrap();
        assert_eq!(comedies.len(), 2);

        let (club, _) = model.get_all("breakfast CLUB", &[], &filters("id")).await.unwrap();
        assert_eq!(club.len(), 1);
        assert_eq!(club[0].title, "The Breakfast Club");
    }

    #[tokio::test]
    async fn list_pages() {
        let model = MovieModel::new(&Engine::new(), Duration::from_secs(3));
        for year in 1990..1995 {
            model.insert(movie("Film", year, &["drama"])).await.unwrap();
        }
        let mut f = filters("id");
        f.page = 2;
        f.page_size = 2;
        let (page, meta) = model.get_all("", &[], &f).await.unwrap();
        assert_eq!(page.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.current_page, 2);
    }
}
