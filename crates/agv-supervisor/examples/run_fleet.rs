//! Minimal fleet driver: a 12×12 site with two warehouses, two agents,
//! and the TCP ingestion endpoint on port 8051.
//!
//! Send it a route, then watch the tick log:
//!
//! ```sh
//! cargo run -p agv-supervisor --example run_fleet
//! echo '{"AUGV_1": ["Warehouse_1"], "AUGV_2": ["Warehouse_2"]}' | nc localhost 8051
//! ```

use std::time::{Duration, Instant};

use nalgebra::Point2;
use tokio::net::TcpListener;

use agv_grid::{CellCoord, MapDefinition};
use agv_supervisor::{Supervisor, SupervisorConfig, inbox_channel, net};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let map = MapDefinition::builder(12, 12)
        .warehouse(CellCoord::new(3, 8))
        .warehouse(CellCoord::new(9, 4))
        .target("Warehouse_1", Point2::new(3.5, 8.5))
        .target("Warehouse_2", Point2::new(9.5, 4.5))
        .target("AUGV_1_Loadingspot", Point2::new(0.5, 0.5))
        .target("AUGV_2_Loadingspot", Point2::new(11.5, 0.5))
        .build()?;

    let mut supervisor = Supervisor::new(&map, SupervisorConfig::default());
    supervisor.spawn_agent("AUGV_1", Point2::new(0.5, 0.5))?;
    supervisor.spawn_agent("AUGV_2", Point2::new(11.5, 0.5))?;

    let (sender, mut inbox) = inbox_channel();
    let listener = TcpListener::bind("0.0.0.0:8051").await?;
    tokio::spawn(net::serve(listener, sender));

    let started = Instant::now();
    let mut interval = tokio::time::interval(Duration::from_millis(100));
    loop {
        interval.tick().await;
        let now = started.elapsed();
        for message in inbox.drain() {
            supervisor.apply(message, now);
        }
        let report = supervisor.tick(now);
        if report.advanced {
            tracing::info!(
                step = report.global_step,
                residual = report.residual_conflicts,
                "advanced"
            );
        }
    }
}
