//! Manifold Markets Probability Trading Bot
//!
//! An automated trading system for Manifold prediction markets.

use clap::{Parser, Subcommand};
use manifold_bot::{
    backtest::{Backtester, StrategyVariant},
    client::ManifoldClient,
    config::Config,
    model::{EnsembleModel, LlmModel},
    monitor::{start_dashboard, DashboardState},
    notify::Notifier,
    portfolio::{PortfolioTracker, TradeRecord},
    scanner::ArbitrageScanner,
    strategy::SignalGenerator,
    types::{BetOutcome, Market},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "manifold-bot")]
#[command(about = "Automated trading bot for Manifold prediction markets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading bot
    Run {
        /// Dry run mode (no actual bets)
        #[arg(long)]
        dry_run: bool,
    },
    /// Show open markets
    Markets {
        /// Number of markets to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Analyze a specific market
    Analyze {
        /// Market ID to analyze
        market_id: String,
    },
    /// Scan markets for arbitrage opportunities
    Scan {
        /// Number of markets to fetch
        #[arg(short, long, default_value = "200")]
        limit: usize,
    },
    /// Show portfolio statistics
    Portfolio,
    /// Backtest the strategy against resolved markets in a JSON file
    Backtest {
        /// Path to a JSON array of resolved markets
        file: String,
        /// Initial capital
        #[arg(long, default_value = "1000")]
        capital: Decimal,
    },
    /// Serve the status dashboard
    Serve {
        /// Port override
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send a test alert
    TestNotify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run { dry_run } => run_bot(config, dry_run).await,
        Commands::Markets { limit } => show_markets(config, limit).await,
        Commands::Analyze { market_id } => analyze_market(config, &market_id).await,
        Commands::Scan { limit } => scan_arbitrage(config, limit).await,
        Commands::Portfolio => show_portfolio(config).await,
        Commands::Backtest { file, capital } => run_backtest(config, &file, capital).await,
        Commands::Serve { port } => serve_dashboard(config, port).await,
        Commands::TestNotify => test_notify(config).await,
    }
}

fn build_model(config: &Config) -> EnsembleModel {
    let mut model = EnsembleModel::with_default_heuristics();
    if let Some(llm_config) = &config.llm {
        match LlmModel::from_config(llm_config) {
            Ok(llm) => {
                tracing::info!("LLM model initialized ({})", llm_config.provider);
                model.add_model(Box::new(llm), dec!(0.5));
            }
            Err(e) => {
                tracing::warn!("Failed to initialize LLM model: {}", e);
            }
        }
    }
    model
}

fn build_notifier(config: &Config) -> Notifier {
    match config.alerts.as_ref().and_then(|a| a.webhook_url.clone()) {
        Some(url) => Notifier::new(url),
        None => {
            tracing::info!("No webhook configured, alerts disabled");
            Notifier::disabled()
        }
    }
}

async fn run_bot(config: Config, dry_run: bool) -> anyhow::Result<()> {
    tracing::info!("Starting Manifold trading bot");

    if dry_run {
        tracing::warn!("Running in DRY RUN mode - no actual bets will be placed");
    }

    let client = ManifoldClient::new(&config.manifold)?;
    let portfolio = Arc::new(PortfolioTracker::load(config.portfolio.expanded_path()).await?);
    let notifier = Arc::new(build_notifier(&config));
    let model = build_model(&config);
    let signal_gen = SignalGenerator::new(config.strategy.clone());
    let scanner = ArbitrageScanner::default();

    // Dashboard runs alongside the trading loop
    let dashboard_state = DashboardState::new(portfolio.clone(), notifier.clone());
    let dashboard_port = config.dashboard.port;
    tokio::spawn(async move {
        if let Err(e) = start_dashboard(dashboard_state, dashboard_port).await {
            tracing::error!("Dashboard error: {}", e);
        }
    });

    let alerts = config.alerts.clone();
    let creator = config.manifold.target_creator.clone();

    loop {
        let markets = match client.get_open_markets(1000, creator.as_deref()).await {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("Failed to fetch markets: {}", e);
                tokio::time::sleep(Duration::from_secs(60)).await;
                continue;
            }
        };

        tracing::info!("Scanning {} open markets...", markets.len());

        for market in &markets {
            if market.total_liquidity < config.strategy.min_liquidity {
                continue;
            }

            let prediction = match model.predict_detailed(market).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!("Model failed for {}: {}", market.id, e);
                    continue;
                }
            };

            let Some(signal) = signal_gen.generate(market, &prediction.as_prediction()) else {
                continue;
            };

            tracing::info!(
                "Signal: {} {} | Model: {:.1}% vs Market: {:.1}% | Edge: {:.1}%",
                signal.outcome,
                market.question,
                signal.model_probability * Decimal::ONE_HUNDRED,
                signal.market_probability * Decimal::ONE_HUNDRED,
                signal.edge.abs() * Decimal::ONE_HUNDRED
            );

            if alerts.as_ref().map(|a| a.notify_opportunities).unwrap_or(false) {
                notifier.trading_opportunity(&signal).await;
            }

            if dry_run || !config.strategy.auto_trade {
                tracing::info!(
                    "SIMULATED: would bet M${:.2} {} on '{}'",
                    signal.stake,
                    signal.outcome,
                    truncate(&market.question, 40)
                );
                continue;
            }

            match client
                .place_bet(&signal.market_id, signal.stake, signal.outcome)
                .await
            {
                Ok(bet) => {
                    tracing::info!("Bet placed: {}", bet.bet_id);
                    let recorded = portfolio.record(TradeRecord::from_signal(&signal)).await?;
                    if !recorded {
                        tracing::warn!("Trade already recorded, skipping append");
                    }
                }
                Err(e) => {
                    tracing::error!("Bet failed: {}", e);
                    if alerts.as_ref().map(|a| a.notify_errors).unwrap_or(false) {
                        notifier
                            .portfolio_warning(
                                "bet placement failed",
                                serde_json::json!({"market_id": signal.market_id, "error": e.to_string()}),
                            )
                            .await;
                    }
                }
            }
        }

        // Arbitrage pass over the same snapshot
        let opportunities = scanner.scan(&markets);
        if !opportunities.is_empty() {
            tracing::info!("Found {} arbitrage opportunities", opportunities.len());
            if alerts.as_ref().map(|a| a.notify_arbitrage).unwrap_or(false) {
                for opp in opportunities.iter().take(3) {
                    notifier.arbitrage_opportunity(opp).await;
                }
            }
        }

        // Settle any open trades whose markets have resolved
        if let Err(e) = settle_resolved(&client, &portfolio).await {
            tracing::warn!("Settlement sweep failed: {}", e);
        }

        let stats = portfolio.statistics().await;
        tracing::info!(
            "Portfolio: {} trades, {:.1}% win rate, M${:.2} total PnL",
            stats.total_trades,
            stats.win_rate,
            stats.total_pnl
        );

        tracing::info!("Sleeping for {} seconds...", config.strategy.scan_interval_secs);
        tokio::time::sleep(Duration::from_secs(config.strategy.scan_interval_secs)).await;
    }
}

/// Close open trades against markets that have since resolved
async fn settle_resolved(
    client: &ManifoldClient,
    portfolio: &PortfolioTracker,
) -> anyhow::Result<()> {
    use manifold_bot::portfolio::TradeStatus;

    let open: Vec<_> = portfolio
        .all()
        .await
        .into_iter()
        .filter(|t| t.status == TradeStatus::Open)
        .collect();

    for trade in open {
        let market = match client.get_market(&trade.market_id).await {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("Could not refresh {}: {}", trade.market_id, e);
                continue;
            }
        };
        if !market.is_resolved {
            continue;
        }
        let Some(resolution) = market.resolution.as_deref() else {
            continue;
        };
        if resolution != "YES" && resolution != "NO" {
            continue;
        }

        let won = resolution == trade.outcome.as_str();
        let pnl = if won {
            let payout = match trade.outcome {
                BetOutcome::Yes => trade.amount / trade.market_probability,
                BetOutcome::No => trade.amount / (Decimal::ONE - trade.market_probability),
            };
            payout - trade.amount
        } else {
            -trade.amount
        };

        let closed = portfolio.resolve(&trade.market_id, resolution, pnl.round_dp(2)).await?;
        tracing::info!(
            "Settled {} trade(s) on {} ({}): M${:.2}",
            closed,
            trade.market_id,
            resolution,
            pnl
        );
    }

    Ok(())
}

async fn show_markets(config: Config, limit: usize) -> anyhow::Result<()> {
    let client = ManifoldClient::new(&config.manifold)?;
    let markets = client
        .get_open_markets(1000, config.manifold.target_creator.as_deref())
        .await?;

    println!("\nOpen Manifold markets:\n");
    println!("{:<60} {:>8} {:>12} {:>12}", "Question", "Prob", "Volume", "Liquidity");
    println!("{}", "-".repeat(96));

    for market in markets.iter().take(limit) {
        println!(
            "{:<60} {:>7.0}% {:>11.0} {:>11.0}",
            truncate(&market.question, 57),
            market.probability * Decimal::ONE_HUNDRED,
            market.volume,
            market.total_liquidity
        );
    }

    Ok(())
}

async fn analyze_market(config: Config, market_id: &str) -> anyhow::Result<()> {
    let client = ManifoldClient::new(&config.manifold)?;
    let market = client.get_market(market_id).await?;

    println!("\nMarket analysis\n");
    println!("Question: {}", market.question);
    if let Some(desc) = &market.description {
        println!("Description: {}", desc);
    }
    println!("\nMarket probability: {:.1}%", market.probability * Decimal::ONE_HUNDRED);
    println!("Volume: M${:.0}", market.volume);
    println!("Liquidity: M${:.0}", market.total_liquidity);

    let model = build_model(&config);
    let prediction = model.predict_detailed(&market).await?;

    println!("\nModel estimate: {:.1}%", prediction.probability * Decimal::ONE_HUNDRED);
    println!("Confidence: {:.1}%", prediction.confidence * Decimal::ONE_HUNDRED);
    println!("Agreement: {:.2}", prediction.agreement);
    for component in &prediction.components {
        println!(
            "  {:<16} {:.1}%",
            component.model,
            component.probability * Decimal::ONE_HUNDRED
        );
    }

    let edge = prediction.probability - market.probability;
    println!("\nEdge: {:.1}%", edge * Decimal::ONE_HUNDRED);

    let signal_gen = SignalGenerator::new(config.strategy.clone());
    match signal_gen.generate(&market, &prediction.as_prediction()) {
        Some(signal) => println!(
            "Recommendation: bet M${:.2} {}",
            signal.stake, signal.outcome
        ),
        None => println!("Recommendation: no bet"),
    }

    Ok(())
}

async fn scan_arbitrage(config: Config, limit: usize) -> anyhow::Result<()> {
    let client = ManifoldClient::new(&config.manifold)?;
    let markets = client.get_open_markets(limit, None).await?;
    let scanner = ArbitrageScanner::default();

    let opportunities = scanner.scan(&markets);
    if opportunities.is_empty() {
        println!("No arbitrage opportunities found across {} markets", markets.len());
        return Ok(());
    }

    println!("\n{} arbitrage opportunities:\n", opportunities.len());
    for opp in &opportunities {
        let alloc = scanner.allocation(opp, config.strategy.bankroll);
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "opportunity": opp,
                "allocation": alloc,
            }))?
        );
    }

    Ok(())
}

async fn show_portfolio(config: Config) -> anyhow::Result<()> {
    let portfolio = PortfolioTracker::load(config.portfolio.expanded_path()).await?;
    let stats = portfolio.statistics().await;

    println!("\nPortfolio statistics\n");
    println!("Total trades:   {}", stats.total_trades);
    println!("Open trades:    {}", stats.open_trades);
    println!("Closed trades:  {}", stats.closed_trades);
    println!("Total P&L:      M${:.2}", stats.total_pnl);
    println!("Win rate:       {:.1}%", stats.win_rate);
    println!("Average edge:   {:.1}%", stats.avg_edge);
    println!("Total invested: M${:.2}", stats.total_invested);
    println!("ROI:            {:.1}%", stats.roi);

    let recent = portfolio.recent(10).await;
    if !recent.is_empty() {
        println!("\nRecent trades:");
        for trade in recent {
            println!(
                "  {} {} M${:.2} on '{}' (pnl M${:.2})",
                trade.timestamp.format("%Y-%m-%d"),
                trade.outcome,
                trade.amount,
                truncate(&trade.market_question, 40),
                trade.pnl
            );
        }
    }

    Ok(())
}

async fn run_backtest(config: Config, file: &str, capital: Decimal) -> anyhow::Result<()> {
    let data = tokio::fs::read_to_string(file).await?;
    let markets: Vec<Market> = serde_json::from_str(&data)?;
    println!("Loaded {} markets from {}", markets.len(), file);

    let model = build_model(&config);
    let mut backtester = Backtester::new(capital);

    let variants = vec![
        StrategyVariant {
            name: "configured".to_string(),
            kelly_fraction: config.strategy.kelly_fraction,
            min_edge: config.strategy.min_edge,
        },
        StrategyVariant {
            name: "half-kelly".to_string(),
            kelly_fraction: dec!(0.5),
            min_edge: config.strategy.min_edge,
        },
        StrategyVariant {
            name: "conservative".to_string(),
            kelly_fraction: dec!(0.1),
            min_edge: dec!(0.10),
        },
    ];

    let comparison = backtester.compare(&markets, &model, &variants).await;

    println!(
        "\n{:<14} {:>7} {:>9} {:>11} {:>10} {:>8} {:>12}",
        "Strategy", "Trades", "Win rate", "Total PnL", "Drawdown", "Sharpe", "Final capital"
    );
    println!("{}", "-".repeat(76));
    for (name, metrics) in comparison {
        println!(
            "{:<14} {:>7} {:>8.1}% {:>11.2} {:>10.2} {:>8.2} {:>12.2}",
            name,
            metrics.total_trades,
            metrics.win_rate,
            metrics.total_pnl,
            metrics.max_drawdown,
            metrics.sharpe_ratio,
            metrics.final_capital
        );
    }

    Ok(())
}

async fn serve_dashboard(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let portfolio = Arc::new(PortfolioTracker::load(config.portfolio.expanded_path()).await?);
    let notifier = Arc::new(build_notifier(&config));
    let state = DashboardState::new(portfolio, notifier);
    let port = port.unwrap_or(config.dashboard.port);

    start_dashboard(state, port).await?;
    Ok(())
}

async fn test_notify(config: Config) -> anyhow::Result<()> {
    let notifier = build_notifier(&config);
    notifier
        .pnl_milestone(dec!(0), dec!(0), "test notification")
        .await;
    println!("Test alert dispatched (check webhook and /api/alerts)");
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}
