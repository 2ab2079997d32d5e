//! Minimal scripted run of the bot pipeline
//!
//! Fetches open markets, analyzes the first one with the ensemble model,
//! sizes a bet with the Kelly criterion, and prints portfolio statistics.
//! Nothing is placed.

use manifold_bot::{
    client::ManifoldClient,
    config::Config,
    model::EnsembleModel,
    portfolio::PortfolioTracker,
    strategy::{optimal_bet, SizingParams},
};
use rust_decimal::Decimal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::load("config.toml")?;
    let client = ManifoldClient::new(&config.manifold)?;
    let model = EnsembleModel::with_default_heuristics();
    let portfolio = PortfolioTracker::load(config.portfolio.expanded_path()).await?;

    println!("Fetching open markets...");
    let markets = client
        .get_open_markets(100, config.manifold.target_creator.as_deref())
        .await?;
    println!("Found {} open markets\n", markets.len());

    if let Some(market) = markets.first() {
        println!("Analyzing: {}", market.question);
        println!(
            "  Market probability: {:.1}%",
            market.probability * Decimal::ONE_HUNDRED
        );
        println!("  Volume: M${:.2}", market.volume);
        println!("  Liquidity: M${:.2}\n", market.total_liquidity);

        let prediction = model.predict_detailed(market).await?;
        println!(
            "  Model probability: {:.1}%",
            prediction.probability * Decimal::ONE_HUNDRED
        );

        let edge = (prediction.probability - market.probability).abs();
        println!("  Edge: {:.1}%\n", edge * Decimal::ONE_HUNDRED);

        let params = SizingParams {
            kelly_fraction: config.strategy.kelly_fraction,
            min_edge: config.strategy.min_edge,
            min_bet: config.strategy.min_bet,
            max_bet: config.strategy.max_bet,
            impact_threshold: config.strategy.impact_threshold,
        };

        match optimal_bet(
            config.strategy.bankroll,
            prediction.probability,
            market.probability,
            market.total_liquidity,
            &params,
        ) {
            Some(plan) => {
                println!("Recommendation:");
                println!("  Bet M${:.2} {}", plan.amount, plan.outcome);
                println!("  Kelly fraction: {}", plan.bankroll_fraction);
            }
            None => println!("No bet recommended (insufficient edge)"),
        }
    }

    let stats = portfolio.statistics().await;
    println!("\nPortfolio statistics:");
    println!("  Total trades: {}", stats.total_trades);
    println!("  Total P&L: M${:.2}", stats.total_pnl);
    println!("  ROI: {:.1}%", stats.roi);
    println!("  Win rate: {:.1}%", stats.win_rate);

    Ok(())
}
