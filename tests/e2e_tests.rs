//! End-to-end integration tests
//!
//! Each fixture directory under tests/fixtures/ holds a `catalog/`
//! directory, an `orders.csv` and the `expected_cards.csv` the run must
//! print. Every fixture runs with both strategies; fixtures avoid seat
//! contention between users so both strategies give the same balances.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::process::Command;
    use std::sync::Arc;
    use tempfile::TempDir;
    use ticketing_engine::cli::StrategyType;
    use ticketing_engine::core::{TicketingConfig, TicketingService};
    use ticketing_engine::io::load_catalog;
    use ticketing_engine::strategy::{create_strategy, BatchConfig};

    fn fixture_dir(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    /// Run a fixture and return the service for further checks
    fn run_fixture(name: &str, strategy_type: StrategyType) -> Arc<TicketingService> {
        let dir = fixture_dir(name);
        let orders_path = dir.join("orders.csv");
        let expected_path = dir.join("expected_cards.csv");

        let service = Arc::new(TicketingService::new(TicketingConfig::new(4, "WC2030", Some(2030))));
        let roles = Arc::new(
            load_catalog(&dir.join("catalog"), &service)
                .unwrap_or_else(|e| panic!("Failed to load catalog of {}: {}", name, e)),
        );

        let strategy = create_strategy(strategy_type, Some(BatchConfig::new(2, 4)));
        let mut output = Vec::new();
        strategy
            .process(&service, &roles, &orders_path, &mut output)
            .unwrap_or_else(|e| panic!("Failed to process orders: {}", e));

        let actual_output = String::from_utf8(output).unwrap();
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", expected_path.display(), e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            name, strategy_type, actual_output, expected_output
        );

        service
    }

    #[rstest]
    #[case("happy_path", 1)]
    #[case("insufficient_balance", 2)]
    #[case("ticket_limit", 4)]
    #[case("wallet", 4)]
    #[case("admin_refused", 1)]
    #[case("multi_user", 7)]
    #[case("malformed_rows", 1)]
    #[case("bootstrap", 6)]
    fn test_fixtures(
        #[case] fixture: &str,
        #[case] expected_tickets: usize,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let service = run_fixture(fixture, strategy);

        assert_eq!(service.purchases().len(), expected_tickets);
        assert!(service.pending_recordings().is_empty());
    }

    #[rstest]
    fn test_every_sold_seat_has_one_purchase(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let service = run_fixture("multi_user", strategy);

        let seats = service.inventory().list_seats("m1").unwrap();
        let sold: Vec<_> = seats.iter().filter(|seat| !seat.is_available()).collect();
        let purchases = service.purchases().for_match("m1");

        assert_eq!(sold.len(), purchases.len());
        for seat in sold {
            assert_eq!(
                purchases.iter().filter(|p| p.seat_id == seat.id).count(),
                1,
                "seat {} must have exactly one purchase",
                seat.id
            );
        }
        assert_eq!(service.inventory().get_match("m1").unwrap().available_seats, 1);
    }

    #[test]
    fn test_binary_writes_cards_and_purchases() {
        let dir = fixture_dir("happy_path");
        let out_dir = TempDir::new().unwrap();
        let purchases_path = out_dir.path().join("tickets.csv");

        let output = Command::new(env!("CARGO_BIN_EXE_ticketing-engine"))
            .arg("--strategy")
            .arg("sync")
            .arg("--catalog")
            .arg(dir.join("catalog"))
            .arg("--purchases-out")
            .arg(&purchases_path)
            .arg(dir.join("orders.csv"))
            .output()
            .expect("Failed to run binary");

        assert!(output.status.success());
        assert_eq!(
            String::from_utf8(output.stdout).unwrap(),
            fs::read_to_string(dir.join("expected_cards.csv")).unwrap()
        );

        let tickets = fs::read_to_string(&purchases_path).unwrap();
        let lines: Vec<&str> = tickets.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ticket_id,user,match,category"));
        assert!(lines[1].starts_with("WC2030-"));
        assert!(lines[1].contains(",u1,m1,VIP,A,1,1,300.00,Holder u1,u1@example.com,card,completed,"));
    }

    #[test]
    fn test_binary_fails_on_missing_catalog() {
        let out_dir = TempDir::new().unwrap();

        let status = Command::new(env!("CARGO_BIN_EXE_ticketing-engine"))
            .arg("--catalog")
            .arg(out_dir.path().join("missing"))
            .arg(fixture_dir("happy_path").join("orders.csv"))
            .status()
            .expect("Failed to run binary");

        assert_eq!(status.code(), Some(1));
    }
}
