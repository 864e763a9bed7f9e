// Collection-level properties of the page store under arbitrary mutation sequences

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use pagesite::{
    config::DatabaseConfig,
    core::PageId,
    infrastructure::{PageRepository, SqlitePageRepository},
    models::{NewPage, PageChanges, PageFilter},
    services::{PageResolver, Resolution},
    views::{TemplateRef, ViewSelector},
    AppError,
};

#[derive(Debug, Clone)]
enum Op {
    Create { title: usize, homepage: Option<bool>, published: bool },
    Update { target: usize, homepage: Option<bool>, slug: Option<usize> },
    Delete { target: usize },
    SetHomepage { target: usize },
}

const TITLES: [&str; 5] = ["Home", "About", "Contact", "Blog", "Pricing"];

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..TITLES.len(), proptest::option::of(any::<bool>()), any::<bool>())
            .prop_map(|(title, homepage, published)| Op::Create { title, homepage, published }),
        2 => (any::<usize>(), proptest::option::of(any::<bool>()), proptest::option::of(0..TITLES.len()))
            .prop_map(|(target, homepage, slug)| Op::Update { target, homepage, slug }),
        1 => any::<usize>().prop_map(|target| Op::Delete { target }),
        1 => any::<usize>().prop_map(|target| Op::SetHomepage { target }),
    ]
}

struct DefaultViews;

impl ViewSelector for DefaultViews {
    fn resolve_template(&self, _slug_hint: &str) -> TemplateRef {
        TemplateRef::Default
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Picks an existing page by index, or an id no page has when the store is empty.
async fn pick(repo: &SqlitePageRepository, target: usize) -> PageId {
    let pages = repo.list(PageFilter::All).await.unwrap();
    if pages.is_empty() {
        PageId::new(i64::MAX)
    } else {
        pages[target % pages.len()].id
    }
}

async fn apply(repo: &SqlitePageRepository, op: &Op) -> Result<(), AppError> {
    match op {
        Op::Create { title, homepage, published } => {
            let mut page = NewPage::new(TITLES[*title]).published(*published);
            if let Some(homepage) = homepage {
                page = page.homepage(*homepage);
            }
            repo.create(page).await.map(|_| ())
        }
        Op::Update { target, homepage, slug } => {
            let id = pick(repo, *target).await;
            let mut changes = PageChanges::default();
            if let Some(homepage) = homepage {
                changes = changes.homepage(*homepage);
            }
            if let Some(slug) = slug {
                changes = changes.slug(TITLES[*slug].to_lowercase());
            }
            repo.update(id, changes).await.map(|_| ())
        }
        Op::Delete { target } => {
            let id = pick(repo, *target).await;
            repo.delete(id).await
        }
        Op::SetHomepage { target } => {
            let id = pick(repo, *target).await;
            repo.set_as_homepage(id).await.map(|_| ())
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn single_homepage_and_unique_slugs(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let result: Result<(), TestCaseError> = runtime().block_on(async {
            let repo = SqlitePageRepository::new_in_memory().await.unwrap();

            for op in &ops {
                match apply(&repo, op).await {
                    Ok(())
                    | Err(AppError::HomepageRequired(_))
                    | Err(AppError::Validation(_))
                    | Err(AppError::NotFound(_)) => {}
                    Err(other) => prop_assert!(false, "unexpected error for {:?}: {}", op, other),
                }

                let pages = repo.list(PageFilter::All).await.unwrap();
                let homepages = pages.iter().filter(|page| page.is_homepage).count();
                if pages.is_empty() {
                    prop_assert_eq!(homepages, 0);
                } else {
                    prop_assert_eq!(homepages, 1, "after {:?}", op);
                }

                let slugs: HashSet<_> = pages.iter().map(|page| page.slug.as_str()).collect();
                prop_assert_eq!(slugs.len(), pages.len());
            }
            Ok(())
        });
        result?;
    }

    #[test]
    fn default_orders_are_sequential(count in 1usize..20) {
        let result: Result<(), TestCaseError> = runtime().block_on(async {
            let repo = SqlitePageRepository::new_in_memory().await.unwrap();
            for i in 0..count {
                repo.create(NewPage::new(format!("Page {}", i))).await.unwrap();
            }

            let orders: Vec<i64> = repo
                .list(PageFilter::All)
                .await
                .unwrap()
                .iter()
                .map(|page| page.order)
                .collect();
            let expected: Vec<i64> = (1..=count as i64).collect();
            prop_assert_eq!(orders, expected);
            prop_assert_eq!(repo.max_order().await.unwrap(), Some(count as i64));
            Ok(())
        });
        result?;
    }

    #[test]
    fn homepage_slug_always_redirects(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let result: Result<(), TestCaseError> = runtime().block_on(async {
            let repo = Arc::new(SqlitePageRepository::new_in_memory().await.unwrap());
            let resolver = PageResolver::new(repo.clone(), Arc::new(DefaultViews));

            for op in &ops {
                let _ = apply(&repo, op).await;
            }

            if let Some(home) = repo.find_homepage().await.unwrap() {
                match resolver.resolve_slug(home.slug.as_str()).await {
                    Ok(resolution) => {
                        prop_assert!(home.is_published);
                        prop_assert_eq!(resolution, Resolution::Redirect("/".to_string()));
                    }
                    Err(AppError::NotFound(_)) => prop_assert!(!home.is_published),
                    Err(other) => prop_assert!(false, "unexpected error: {}", other),
                }
            }
            Ok(())
        });
        result?;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_yield_single_homepage() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("pages.db").display()),
        max_connections: 5,
    };
    let repo = Arc::new(SqlitePageRepository::connect(&config).await.unwrap());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.create(NewPage::new(format!("Page {}", i))).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let pages = repo.list(PageFilter::All).await.unwrap();
    assert_eq!(pages.len(), 16);
    assert_eq!(pages.iter().filter(|page| page.is_homepage).count(), 1);

    let orders: Vec<i64> = pages.iter().map(|page| page.order).collect();
    assert_eq!(orders, (1..=16).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_first_page_is_always_homepage() {
    let repo = SqlitePageRepository::new_in_memory().await.unwrap();
    let first = repo
        .create(NewPage::new("Not Home").homepage(false))
        .await
        .unwrap();
    assert!(first.is_homepage);

    let second = repo.create(NewPage::new("Second")).await.unwrap();
    assert!(!second.is_homepage);
}

#[tokio::test]
async fn test_only_page_can_be_deleted_then_next_is_homepage() {
    let repo = SqlitePageRepository::new_in_memory().await.unwrap();
    let only = repo.create(NewPage::new("Only")).await.unwrap();
    repo.delete(only.id).await.unwrap();
    assert_eq!(repo.count_all().await.unwrap(), 0);

    let next = repo.create(NewPage::new("Next")).await.unwrap();
    assert!(next.is_homepage);
}

#[tokio::test]
async fn test_publish_stamps_and_unpublish_clears() {
    let repo = SqlitePageRepository::new_in_memory().await.unwrap();
    let page = repo.create(NewPage::new("Draft")).await.unwrap();
    assert!(page.published_at.is_none());

    let before = chrono::Utc::now();
    let published = repo
        .update(page.id, PageChanges::default().published(true))
        .await
        .unwrap();
    let stamped = published.published_at.unwrap();
    assert!(stamped >= before - chrono::Duration::seconds(1));
    assert!(stamped <= chrono::Utc::now() + chrono::Duration::seconds(1));

    let unpublished = repo
        .update(page.id, PageChanges::default().published(false))
        .await
        .unwrap();
    assert!(unpublished.published_at.is_none());
}
