use std::sync::Arc;

use loadkit_orm::{
    course_catalog, Author, Course, Dataset, DatabasePool, FetchRequest, Filter, LoadingConfig, LoadingStrategy,
    LoadingStrategyRunner, MemoryDatabase, ModelError, Tag,
};

fn author(id: i64, name: &str) -> Author {
    Author { id, name: name.to_string() }
}

fn tag(id: i64, name: &str) -> Tag {
    Tag { id, name: name.to_string(), moderator_id: None }
}

/// `count` courses split between two authors, all tagged A and B
fn catalogue(count: i64) -> Dataset {
    Dataset {
        authors: vec![author(1, "First"), author(2, "Second")],
        courses: (1..=count)
            .map(|id| Course {
                id,
                name: format!("Course {}", id),
                price: 10.0 * id as f64,
                author_id: if id % 2 == 0 { 2 } else { 1 },
                tag_ids: vec![1, 2],
            })
            .collect(),
        tags: vec![tag(1, "A"), tag(2, "B")],
        ..Dataset::default()
    }
}

fn runner(dataset: Dataset) -> (MemoryDatabase, LoadingStrategyRunner) {
    let database = MemoryDatabase::with_dataset(dataset).expect("valid dataset");
    let registry = course_catalog().expect("catalog registers");
    let runner = LoadingStrategyRunner::new(Arc::new(database.clone()), registry, LoadingConfig::default());
    (database, runner)
}

#[tokio::test]
async fn eager_is_one_round_trip_for_any_number_of_roots() {
    for count in 0..=6 {
        let (database, runner) = runner(catalogue(count));
        let request = FetchRequest::new("courses").with("Author").with("Author.Address").with("Tags");

        let outcome = runner.fetch(&request, LoadingStrategy::Eager).await.unwrap();

        assert_eq!(outcome.records.len(), count as usize);
        assert_eq!(outcome.round_trips, 1);
        assert_eq!(database.round_trips(), 1);
        for course in &outcome.records {
            assert!(course.related_one("Author").unwrap().is_some());
            assert_eq!(course.related_many("Tags").unwrap().len(), 2);
        }
    }
}

#[tokio::test]
async fn explicit_is_one_plus_distinct_paths() {
    let path_sets: [&[&str]; 4] = [&[], &["Author"], &["Author", "Tags"], &["Author", "Author.Address", "Tags"]];

    for count in [0, 1, 3, 5] {
        for paths in path_sets {
            let (database, runner) = runner(catalogue(count));
            let request = paths.iter().fold(FetchRequest::new("courses"), |request, path| request.with(path));

            let outcome = runner.fetch(&request, LoadingStrategy::Explicit).await.unwrap();

            assert_eq!(outcome.round_trips, 1 + paths.len(), "count={} paths={:?}", count, paths);
            assert_eq!(database.round_trips(), (1 + paths.len()) as u64);
        }
    }
}

#[tokio::test]
async fn explicit_repeated_path_counts_once() {
    let (_database, runner) = runner(catalogue(3));
    let request = FetchRequest::new("courses").with("Author").with("Author");
    let outcome = runner.fetch(&request, LoadingStrategy::Explicit).await.unwrap();
    assert_eq!(outcome.round_trips, 2);
}

#[tokio::test]
async fn eager_single_course_with_tags() {
    let (database, runner) = runner(catalogue(3));
    let request = FetchRequest::new("courses").filter(Filter::by_id(2)).with("Tags");

    let outcome = runner.fetch(&request, LoadingStrategy::Eager).await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    let course: Course = outcome.records[0].decode().unwrap();
    assert_eq!(course.id, 2);
    let tags: Vec<String> = outcome.records[0]
        .related_models::<Tag>("Tags")
        .unwrap()
        .into_iter()
        .map(|tag| tag.name)
        .collect();
    assert_eq!(tags, vec!["A", "B"]);
    assert_eq!(database.round_trips(), 1);
}

#[tokio::test]
async fn explicit_three_courses_two_authors() {
    let (database, runner) = runner(catalogue(3));
    let request = FetchRequest::new("courses").with("Author");

    let outcome = runner.fetch(&request, LoadingStrategy::Explicit).await.unwrap();

    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.round_trips, 2);
    assert_eq!(database.round_trips(), 2);
    let authors: Vec<i64> = outcome
        .records
        .iter()
        .map(|course| course.related_one("Author").unwrap().unwrap().value("id").unwrap())
        .collect();
    assert_eq!(authors, vec![1, 2, 1]);
}

#[tokio::test]
async fn explicit_path_filter_only_narrows_that_path() {
    let (_database, runner) = runner(catalogue(2));
    let request = FetchRequest::new("courses")
        .with_filtered("Tags", Filter::all().where_eq("name", "B"))
        .with("Author");

    let outcome = runner.fetch(&request, LoadingStrategy::Explicit).await.unwrap();

    assert_eq!(outcome.records.len(), 2);
    for course in &outcome.records {
        let tags = course.related_many("Tags").unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].value::<String>("name").unwrap(), "B");
        assert!(course.related_one("Author").unwrap().is_some());
    }
}

#[tokio::test]
async fn eager_path_filter_matches_explicit() {
    let (_database, runner) = runner(catalogue(2));
    let request = FetchRequest::new("courses").with_filtered("Tags", Filter::all().where_eq("name", "A"));

    let eager = runner.fetch(&request, LoadingStrategy::Eager).await.unwrap();
    let explicit = runner.fetch(&request, LoadingStrategy::Explicit).await.unwrap();

    assert_eq!(eager.records, explicit.records);
}

#[tokio::test]
async fn explicit_issues_path_queries_with_no_parents() {
    let (database, runner) = runner(catalogue(3));
    let request = FetchRequest::new("courses")
        .filter(Filter::all().where_gt("price", 1000))
        .with("Author")
        .with("Tags");

    let outcome = runner.fetch(&request, LoadingStrategy::Explicit).await.unwrap();

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.round_trips, 3);
    assert_eq!(database.round_trips(), 3);
}

#[tokio::test]
async fn lazy_same_root_and_path_costs_at_most_one_round_trip() {
    let (_database, runner) = runner(catalogue(3));
    let mut session = runner.session().await.unwrap();
    let request = FetchRequest::new("courses").filter(Filter::by_id(1));
    let mut course = session.fetch_one(&request, LoadingStrategy::Lazy).await.unwrap();
    assert_eq!(session.round_trips(), 1);

    session.load_lazy(&mut course, "Author").await.unwrap();
    session.load_lazy(&mut course, "Author").await.unwrap();
    assert_eq!(session.round_trips(), 2);

    // A fresh copy of the same course hits the memo
    let mut again = session.fetch_one(&request, LoadingStrategy::Lazy).await.unwrap();
    session.load_lazy(&mut again, "Author").await.unwrap();
    assert_eq!(session.round_trips(), 3);
    assert_eq!(session.lazy_cache_stats().hits, 1);
    assert_eq!(again.related_one("Author").unwrap(), course.related_one("Author").unwrap());
}

#[tokio::test]
async fn lazy_touching_every_root_is_n_plus_one() {
    let (_database, runner) = runner(catalogue(4));
    let mut session = runner.session().await.unwrap();
    let mut courses = session.fetch(&FetchRequest::new("courses"), LoadingStrategy::Lazy).await.unwrap();
    assert!(courses.iter().all(|course| !course.is_loaded("Author")));

    for course in courses.iter_mut() {
        session.load_lazy(course, "Author").await.unwrap();
    }

    assert_eq!(session.round_trips(), 1 + courses.len());
}

#[tokio::test]
async fn compare_reports_every_strategy() {
    let (_database, runner) = runner(catalogue(3));
    let request = FetchRequest::new("courses").with("Author").with("Tags");

    let reports = runner.compare(&request).await.unwrap();

    let counts: Vec<(LoadingStrategy, usize)> =
        reports.iter().map(|report| (report.strategy, report.round_trips)).collect();
    assert_eq!(
        counts,
        vec![
            (LoadingStrategy::Lazy, 1 + 3 * 2),
            (LoadingStrategy::Eager, 1),
            (LoadingStrategy::Explicit, 3),
        ]
    );
    assert!(reports.iter().all(|report| report.roots == 3));
    assert!(reports[0].lazy_cache.is_some());
}

#[tokio::test]
async fn singleton_not_found_and_ambiguous() {
    let (_database, runner) = runner(catalogue(3));

    for strategy in LoadingStrategy::ALL {
        let missing = FetchRequest::new("courses").filter(Filter::by_id(99)).with("Author").single();
        let err = runner.fetch(&missing, strategy).await.unwrap_err();
        assert_eq!(err, ModelError::NotFound("courses".to_string()), "{}", strategy);

        let many = FetchRequest::new("courses").filter(Filter::all().where_eq("author_id", 1)).single();
        let err = runner.fetch(&many, strategy).await.unwrap_err();
        assert_eq!(
            err,
            ModelError::AmbiguousSingleton { table: "courses".to_string(), count: 2 },
            "{}",
            strategy
        );
    }
}

#[tokio::test]
async fn unknown_path_fails_before_any_query() {
    let (database, runner) = runner(catalogue(3));

    for strategy in LoadingStrategy::ALL {
        for path in ["Publisher", "Author.Publisher", "Author..Address", ""] {
            let request = FetchRequest::new("courses").with("Author").with(path);
            let err = runner.fetch(&request, strategy).await.unwrap_err();
            assert!(matches!(err, ModelError::InvalidPath(_)), "{} {:?}: {:?}", strategy, path, err);
        }
    }
    assert_eq!(database.round_trips(), 0);
}

#[tokio::test]
async fn unpopulated_path_fails_fast() {
    let (_database, runner) = runner(catalogue(1));
    let request = FetchRequest::new("courses").with("Tags");

    let outcome = runner.fetch(&request, LoadingStrategy::Eager).await.unwrap();

    let err = outcome.records[0].related("Author").unwrap_err();
    assert_eq!(err, ModelError::NotLoaded("courses.Author".to_string()));
}

#[tokio::test]
async fn unavailable_collaborator_fails_only_the_current_call() {
    let (database, runner) = runner(catalogue(2));
    let request = FetchRequest::new("courses").with("Author");

    database.set_available(false);
    for strategy in LoadingStrategy::ALL {
        let err = runner.fetch(&request, strategy).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    database.set_available(true);
    let outcome = runner.fetch(&request, LoadingStrategy::Explicit).await.unwrap();
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.round_trips, 2);
}

#[tokio::test]
async fn collaborator_outage_does_not_poison_the_session() {
    let (database, runner) = runner(catalogue(2));
    let mut session = runner.session().await.unwrap();
    let request = FetchRequest::new("courses").with("Author");

    database.set_available(false);
    assert!(session.fetch(&request, LoadingStrategy::Explicit).await.unwrap_err().is_unavailable());
    assert_eq!(session.round_trips(), 0);

    database.set_available(true);
    let courses = session.fetch(&request, LoadingStrategy::Explicit).await.unwrap();
    assert_eq!(courses.len(), 2);
    assert_eq!(session.round_trips(), 2);
}

#[tokio::test]
async fn sessions_release_their_connection_on_error() {
    let (database, runner) = runner(catalogue(2));

    let bad = FetchRequest::new("courses").with("Nope");
    assert!(runner.fetch(&bad, LoadingStrategy::Eager).await.is_err());

    {
        let mut session = runner.session().await.unwrap();
        let missing = FetchRequest::new("courses").filter(Filter::by_id(42)).single();
        assert!(session.fetch(&missing, LoadingStrategy::Explicit).await.is_err());
        assert_eq!(database.stats().active(), 1);
    }

    let stats = database.stats();
    assert_eq!(stats.acquired, 2);
    assert_eq!(stats.active(), 0);
}

#[tokio::test]
async fn has_many_and_has_one_from_authors() {
    let mut dataset = Dataset::demo();
    dataset.validate().unwrap();
    dataset.courses.retain(|course| course.author_id == 1);
    let (_database, runner) = runner(dataset);

    let request = FetchRequest::for_model::<Author>().filter(Filter::by_id(1)).with("Courses").with("Address");
    for strategy in [LoadingStrategy::Eager, LoadingStrategy::Explicit] {
        let outcome = runner.fetch(&request, strategy).await.unwrap();
        let author = &outcome.records[0];
        assert_eq!(author.related_many("Courses").unwrap().len(), 2);
        assert!(author.related_one("Address").unwrap().is_some());
    }
}
