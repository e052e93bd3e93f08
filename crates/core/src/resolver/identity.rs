//! Cache keys derived from a query's identity.
//!
//! A query is identified, in order of preference, by its TMDB id, its IMDB
//! id, or its canonical title (plus year when known).

use crate::scorer::CatalogQuery;

/// Every identity the query has, strongest first.
pub(crate) fn identities(query: &CatalogQuery) -> Vec<String> {
    let mut keys = Vec::with_capacity(3);
    if let Some(tmdb) = &query.tmdb {
        keys.push(format!("tmdb:{}", tmdb));
    }
    if let Some(imdb) = &query.imdb {
        keys.push(format!("imdb:{}", imdb));
    }
    if !query.canonical_key.is_empty() {
        match query.year {
            Some(year) => keys.push(format!("title:{}:{}", query.canonical_key, year)),
            None => keys.push(format!("title:{}", query.canonical_key)),
        }
    }
    keys
}

/// Resolved-episode key: `{provider}|{identity}|s{season}e{episode}`.
pub(crate) fn resolved_key(
    provider: &str,
    query: &CatalogQuery,
    season: u32,
    episode: u32,
) -> Option<String> {
    identities(query)
        .into_iter()
        .next()
        .map(|identity| format!("{}|{}|s{}e{}", provider, identity, season, episode))
}

/// Series binding keys, one per identity: `{provider}|{identity}`.
pub(crate) fn series_binding_keys(provider: &str, query: &CatalogQuery) -> Vec<(String, String)> {
    identities(query)
        .into_iter()
        .map(|identity| (format!("{}|{}", provider, identity), identity))
        .collect()
}

/// Movie binding keys: `{provider}|movie:{identity}`.
pub(crate) fn movie_binding_keys(provider: &str, query: &CatalogQuery) -> Vec<(String, String)> {
    identities(query)
        .into_iter()
        .map(|identity| {
            let identity = format!("movie:{}", identity);
            (format!("{}|{}", provider, identity), identity)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identities_strongest_first() {
        let query = CatalogQuery::new("The Office", Some(2005), Some("2316"), Some("tt0386676"));
        assert_eq!(
            identities(&query),
            vec!["tmdb:2316", "imdb:tt0386676", "title:office:2005"]
        );
    }

    #[test]
    fn test_resolved_key_uses_first_identity() {
        let query = CatalogQuery::new("The Office", None, None, Some("tt0386676"));
        assert_eq!(
            resolved_key("host/u", &query, 2, 3).as_deref(),
            Some("host/u|imdb:tt0386676|s2e3")
        );

        let query = CatalogQuery::new("The Office", None, None, None);
        assert_eq!(
            resolved_key("host/u", &query, 1, 1).as_deref(),
            Some("host/u|title:office|s1e1")
        );

        let query = CatalogQuery::new("The", None, None, None);
        assert_eq!(resolved_key("host/u", &query, 1, 1), None);
    }

    #[test]
    fn test_binding_keys_are_provider_scoped() {
        let query = CatalogQuery::new("Heat", Some(1995), Some("949"), None);
        let series = series_binding_keys("h/u", &query);
        assert_eq!(series[0], ("h/u|tmdb:949".to_string(), "tmdb:949".to_string()));

        let movies = movie_binding_keys("h/u", &query);
        assert_eq!(movies[1].0, "h/u|movie:title:heat:1995");
    }
}
