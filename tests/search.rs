//! Query execution over the in-memory store: ranked and unranked paths,
//! paging past the end, and similar-episode lookups.

use episode_browser_core::models::{Episode, EpisodeFilter, EpisodeKey, EpisodeOrder};
use episode_browser_core::query::{transition, FilterInput, PageAction, Query, QueryEvent};
use episode_browser_core::search::{episode_detail, search};
use episode_browser_core::store::memory::InMemoryStore;
use episode_browser_core::store::Store;

fn ep(season: u32, episode: u32, title: &str, plot: &str) -> Episode {
    Episode::new("Simpsons", season, episode, title)
        .unwrap()
        .with_plot(Some(plot.to_string()))
}

async fn store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .upsert_episodes(&[
            ep(1, 1, "Roasting", "Homer works as a mall Santa for Christmas money."),
            ep(1, 2, "Bart the Genius", "Bart cheats on an intelligence test."),
            ep(1, 3, "Homer's Odyssey", "Homer loses his job at the nuclear plant."),
            ep(2, 1, "Bart Gets an F", "Bart studies for a history test after failing."),
            ep(2, 2, "Simpson and Delilah", "Homer buys a hair tonic that works."),
            ep(3, 1, "Stark Raving Dad", "Homer is committed to a mental institution."),
        ])
        .await
        .unwrap();
    store
}

fn text_query(text: &str, page_size: u32) -> Query {
    Query::new(page_size).with_filter(EpisodeFilter {
        text: Some(text.to_string()),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_unranked_pages_in_natural_order() {
    let store = store().await;
    let q = Query::new(4);
    let page = search(&store, &q).await.unwrap();
    assert_eq!(page.total, 6);
    assert_eq!(page.total_pages, 2);
    assert!(page.has_next);
    assert!(page.hits.iter().all(|h| h.score.is_none()));
    assert_eq!(page.hits[0].episode.title, "Roasting");

    let page = search(&store, &q.with_page(2)).await.unwrap();
    assert_eq!(page.hits.len(), 2);
    assert!(!page.has_next);
}

#[tokio::test]
async fn test_ranked_text_orders_by_relevance_then_pages() {
    let store = store().await;

    let page = search(&store, &text_query("test", 10)).await.unwrap();
    assert_eq!(page.total, 2);
    let scores: Vec<f64> = page.hits.iter().map(|h| h.score.unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));

    let q = text_query("homer", 2);
    let first = search(&store, &q).await.unwrap();
    assert_eq!(first.total, 4, "substring pre-filter keeps title or plot matches");
    assert_eq!(first.hits.len(), 2);
    assert!(first.has_next);
    let second = search(&store, &q.clone().with_page(2)).await.unwrap();
    assert_eq!(second.hits.len(), 2);
    assert!(!second.has_next);
    let titles: Vec<&str> = first
        .hits
        .iter()
        .chain(second.hits.iter())
        .map(|h| h.episode.title.as_str())
        .collect();
    assert!(!titles.contains(&"Bart the Genius"));
}

#[tokio::test]
async fn test_rank_off_keeps_requested_order() {
    let store = store().await;
    let mut q = text_query("bart", 10);
    q.rank = false;
    q.order = EpisodeOrder::Natural;
    let page = search(&store, &q).await.unwrap();
    let titles: Vec<&str> = page.hits.iter().map(|h| h.episode.title.as_str()).collect();
    assert_eq!(titles, vec!["Bart the Genius", "Bart Gets an F"]);
    assert!(page.hits.iter().all(|h| h.score.is_none()));
}

#[tokio::test]
async fn test_page_past_end_is_empty_with_total() {
    let store = store().await;
    let page = search(&store, &Query::new(4).with_page(7)).await.unwrap();
    assert!(page.hits.is_empty());
    assert_eq!(page.total, 6);
    assert_eq!(page.page, 7);
    assert!(!page.has_next);
}

#[tokio::test]
async fn test_filter_change_event_returns_first_page() {
    let store = store().await;
    let q = Query::new(2).with_page(3);
    let next = transition(
        &q,
        &QueryEvent {
            filters: FilterInput {
                season: Some(1),
                ..Default::default()
            },
            page_action: Some(PageAction::Next),
        },
    );
    assert_eq!(next.page, 1);
    let page = search(&store, &next).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.hits.len(), 2);
}

#[tokio::test]
async fn test_episode_detail() {
    let store = store().await;
    let key = EpisodeKey {
        show: "Simpsons".into(),
        season: 1,
        episode: 2,
    };
    let detail = episode_detail(&store, &key, 3).await.unwrap().unwrap();
    assert_eq!(detail.episode.title, "Bart the Genius");
    assert_eq!(detail.similar.len(), 3);
    assert!(detail.similar.iter().all(|s| s.episode.key() != key));
    assert_eq!(detail.similar[0].episode.title, "Bart Gets an F");

    let missing = EpisodeKey {
        show: "Simpsons".into(),
        season: 9,
        episode: 9,
    };
    assert!(episode_detail(&store, &missing, 3).await.unwrap().is_none());
}

#[tokio::test]
async fn test_padded_and_blank_text_from_json_query() {
    let store = store().await;

    let padded: Query =
        serde_json::from_str(r#"{"filter":{"text":"  bart  "},"page_size":10}"#).unwrap();
    let page = search(&store, &padded).await.unwrap();
    assert_eq!(page.total, 2);
    assert!(page.hits.iter().all(|h| h.score.is_some()));

    let mut unranked = padded.clone();
    unranked.rank = false;
    assert_eq!(search(&store, &unranked).await.unwrap().total, 2);

    let blank: Query = serde_json::from_str(r#"{"filter":{"text":"   "}}"#).unwrap();
    let page = search(&store, &blank).await.unwrap();
    assert_eq!(page.total, 6, "blank text applies no filter");
    assert!(page.hits.iter().all(|h| h.score.is_none()));
}
