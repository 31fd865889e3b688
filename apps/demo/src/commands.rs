use clap::Args;
use loadkit_orm::{FetchRequest, Filter, LoadingStrategy, LoadingStrategyRunner};
use tracing::debug;

/// Which roots to fetch and which relationships to bring along
#[derive(Args, Debug, Clone)]
pub struct Selection {
    /// Root table
    #[arg(long, default_value = "courses")]
    pub table: String,

    /// Root primary key
    #[arg(long)]
    pub id: Option<i64>,

    /// Root condition such as `price=0` or `id>=2`; repeatable
    #[arg(long = "where", value_name = "CONDITION")]
    pub conditions: Vec<String>,

    /// Relationship path such as `Author` or `Author.Address`; repeatable
    #[arg(long = "path", value_name = "PATH")]
    pub paths: Vec<String>,

    /// Condition on a path's related rows, `PATH:CONDITION`; repeatable
    #[arg(long = "filter", value_name = "PATH:CONDITION")]
    pub filters: Vec<String>,

    /// Require exactly one root
    #[arg(long)]
    pub single: bool,
}

pub fn build_request(selection: &Selection) -> anyhow::Result<FetchRequest> {
    let mut request = FetchRequest::new(&selection.table);

    if let Some(id) = selection.id {
        request = request.filter(Filter::by_id(id));
    }
    for condition in &selection.conditions {
        request = request.filter(Filter::parse(condition)?);
    }
    for path in &selection.paths {
        request = request.with(path);
    }
    for filter in &selection.filters {
        let (path, condition) = filter
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("expected PATH:CONDITION, got '{}'", filter))?;
        request = request.with_filtered(path.trim(), Filter::parse(condition)?);
    }
    if selection.single {
        request = request.single();
    }

    debug!(table = %request.table, filter = %request.filter, paths = ?request.path_names(), "request built");
    Ok(request)
}

pub async fn fetch(runner: &LoadingStrategyRunner, request: &FetchRequest, strategy: LoadingStrategy) -> anyhow::Result<()> {
    let mut session = runner.session().await?;
    let mut records = session.fetch(request, strategy).await?;
    let fetched = session.round_trips();

    // Lazy loading has nothing populated yet; touch every path to show what it costs
    if strategy == LoadingStrategy::Lazy {
        for root in records.iter_mut() {
            for spec in &request.paths {
                session.load_lazy(root, &spec.path).await?;
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&records)?);
    println!();
    println!("strategy:    {}", strategy);
    println!("roots:       {}", records.len());
    println!("round trips: {}", session.round_trips());
    if strategy == LoadingStrategy::Lazy {
        let stats = session.lazy_cache_stats();
        println!(
            "  fetch {} + on demand {} (memo hits {}, misses {})",
            fetched,
            session.round_trips() - fetched,
            stats.hits,
            stats.misses
        );
    }
    for (index, entry) in session.query_log().iter().enumerate() {
        println!("  {:>2}. {} {} WHERE {} -> {} rows", index + 1, entry.kind, entry.table, entry.filter, entry.rows);
    }
    Ok(())
}

pub async fn compare(runner: &LoadingStrategyRunner, request: &FetchRequest) -> anyhow::Result<()> {
    let reports = runner.compare(request).await?;

    println!("{:<10} {:>6} {:>12}", "strategy", "roots", "round trips");
    for report in &reports {
        println!("{:<10} {:>6} {:>12}", report.strategy.to_string(), report.roots, report.round_trips);
    }
    Ok(())
}
