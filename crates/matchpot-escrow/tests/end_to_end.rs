//! End-to-end tests across the payment ledger and the escrow coordinator.
//!
//! Players fund wallets through approved deposits, join matches (fees
//! escrowed), get settled (fees burned) and the winner is paid through an
//! admin-approved prize request.

use std::sync::Arc;

use matchpot_escrow::MatchEscrow;
use matchpot_ledger::{InMemoryStore, PaymentLedger, RequestFilter, StaticRoles};
use matchpot_types::*;
use rust_decimal::Decimal;

struct Platform {
    store: Arc<InMemoryStore>,
    ledger: PaymentLedger<InMemoryStore>,
    escrow: MatchEscrow<InMemoryStore>,
    admin: UserId,
}

impl Platform {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let admin = UserId::new();
        let config = LedgerConfig::default().with_admin(admin);
        let roles = Arc::new(StaticRoles::from_config(&config));
        let store = Arc::new(InMemoryStore::new());
        Self {
            ledger: PaymentLedger::new(Arc::clone(&store), roles.clone(), config),
            escrow: MatchEscrow::new(Arc::clone(&store), roles),
            store,
            admin,
        }
    }

    fn player(&self, deposit: Decimal) -> UserId {
        let user = UserId::new();
        let id = self
            .ledger
            .submit_deposit(user, deposit, &format!("UTR-{}", user.0.simple()))
            .unwrap();
        self.ledger
            .resolve_deposit(id, self.admin, Decision::Approve)
            .unwrap();
        user
    }

    fn pools(&self, user: UserId) -> (Decimal, Decimal) {
        self.store
            .wallet(user)
            .unwrap()
            .map_or((Decimal::ZERO, Decimal::ZERO), |w| w.pools())
    }
}

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

// =============================================================================
// Capacity: slots=2, fee=20; third join rejected, nothing written
// =============================================================================
#[test]
fn third_join_exceeds_capacity() {
    let p = Platform::new();
    let m = p
        .escrow
        .create_match(p.admin, NewMatch::dummy(dec(20), dec(37)))
        .unwrap();
    let players: Vec<UserId> = (0..3).map(|_| p.player(dec(50))).collect();

    p.escrow.join_match(m, players[0]).unwrap();
    p.escrow.join_match(m, players[1]).unwrap();
    let err = p.escrow.join_match(m, players[2]).unwrap_err();
    assert!(
        matches!(err, LedgerError::CapacityExceeded { match_id, slots: 2 } if match_id == m),
        "Expected CapacityExceeded, got: {err:?}"
    );

    assert_eq!(p.pools(players[2]), (dec(50), Decimal::ZERO));
    let roster = p.escrow.roster(m).unwrap();
    assert_eq!(roster.len(), 2);
    assert!(roster.iter().all(|e| e.user_id != players[2]));
    assert_eq!(p.escrow.match_record(m).unwrap().joined_count, 2);
}

// =============================================================================
// Settlement and payout: fees burned, prize 37.2 credited on approval
// =============================================================================
#[test]
fn settle_then_cashout_pays_winner() {
    let p = Platform::new();
    let m = p
        .escrow
        .create_match(p.admin, NewMatch::dummy(dec(20), Decimal::new(372, 1)))
        .unwrap();
    let winner = p.player(dec(50));
    let loser = p.player(dec(50));
    p.escrow.join_match(m, winner).unwrap();
    p.escrow.join_match(m, loser).unwrap();
    assert_eq!(p.pools(winner), (dec(30), dec(20)));

    let settlement = p.escrow.settle_match(m, winner, p.admin).unwrap();
    assert_eq!(settlement.total_burned(), dec(40));
    assert_eq!(p.pools(winner), (dec(30), Decimal::ZERO));
    assert_eq!(p.pools(loser), (dec(30), Decimal::ZERO));
    assert_eq!(p.escrow.match_record(m).unwrap().status, MatchStatus::Claimed);

    let prize_id = p.escrow.request_cashout(m, winner).unwrap();
    let pending = p.ledger.request(prize_id).unwrap();
    assert!(pending.is_pending());
    assert_eq!(pending.request_type(), RequestType::Prize);
    assert_eq!(p.pools(winner), (dec(30), Decimal::ZERO));

    p.ledger
        .resolve_prize(prize_id, p.admin, Decision::Approve)
        .unwrap();
    assert_eq!(p.pools(winner), (Decimal::new(672, 1), Decimal::ZERO));
    assert_eq!(
        p.escrow.match_record(m).unwrap().payout_status,
        PayoutStatus::Paid
    );

    // Paid once only.
    assert!(matches!(
        p.ledger
            .resolve_prize(prize_id, p.admin, Decision::Approve)
            .unwrap_err(),
        LedgerError::AlreadyProcessed(_)
    ));
    assert!(matches!(
        p.escrow.request_cashout(m, winner).unwrap_err(),
        LedgerError::AlreadyPaid(_)
    ));
    assert_eq!(p.pools(winner), (Decimal::new(672, 1), Decimal::ZERO));
}

#[test]
fn prize_denial_is_terminal() {
    let p = Platform::new();
    let m = p
        .escrow
        .create_match(p.admin, NewMatch::dummy(dec(20), dec(37)))
        .unwrap();
    let winner = p.player(dec(50));
    p.escrow.join_match(m, winner).unwrap();
    p.escrow.settle_match(m, winner, p.admin).unwrap();

    let prize_id = p.escrow.request_cashout(m, winner).unwrap();
    p.ledger
        .resolve_prize(prize_id, p.admin, Decision::Deny)
        .unwrap();

    let record = p.escrow.match_record(m).unwrap();
    assert!(record.payout_requested);
    assert_eq!(record.payout_status, PayoutStatus::Unset);
    assert_eq!(p.pools(winner), (dec(30), Decimal::ZERO));
    assert!(matches!(
        p.escrow.request_cashout(m, winner).unwrap_err(),
        LedgerError::AlreadyRequested(_)
    ));
}

#[test]
fn prize_resolution_through_generic_resolve() {
    let p = Platform::new();
    let m = p
        .escrow
        .create_match(p.admin, NewMatch::dummy(dec(10), dec(15)))
        .unwrap();
    let winner = p.player(dec(10));
    p.escrow.join_match(m, winner).unwrap();
    p.escrow.settle_match(m, winner, p.admin).unwrap();
    let prize_id = p.escrow.request_cashout(m, winner).unwrap();

    let resolved = p.ledger.resolve(prize_id, p.admin, Decision::Approve).unwrap();
    assert_eq!(resolved.approved_by(), Some(p.admin));
    assert_eq!(p.pools(winner), (dec(15), Decimal::ZERO));

    let prizes = p
        .ledger
        .list_requests(&RequestFilter::new().of_type(RequestType::Prize))
        .unwrap();
    assert_eq!(prizes.len(), 1);
    assert_eq!(prizes[0].status, RequestStatus::Approved);
}

// =============================================================================
// Concurrent joins never overfill the roster
// =============================================================================
#[test]
fn concurrent_joins_respect_capacity() {
    let p = Platform::new();
    let m = p
        .escrow
        .create_match(p.admin, NewMatch::dummy(dec(20), dec(37)))
        .unwrap();
    let players: Vec<UserId> = (0..8).map(|_| p.player(dec(50))).collect();

    let joined: usize = std::thread::scope(|s| {
        let handles: Vec<_> = players
            .iter()
            .map(|&user| {
                let escrow = &p.escrow;
                s.spawn(move || loop {
                    match escrow.join_match(m, user) {
                        Ok(_) => return 1usize,
                        Err(e) if e.is_retryable() => {}
                        Err(LedgerError::CapacityExceeded { .. }) => return 0,
                        Err(e) => panic!("unexpected join failure: {e}"),
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(joined, 2);
    assert_eq!(p.escrow.roster(m).unwrap().len(), 2);
    let escrowed: Decimal = players.iter().map(|&u| p.pools(u).1).sum();
    assert_eq!(escrowed, dec(40));
    for &u in &players {
        let (available, locked) = p.pools(u);
        assert_eq!(available + locked, dec(50));
    }
}

// =============================================================================
// Rejections leave balances untouched
// =============================================================================
#[test]
fn rejected_joins_leave_balances_untouched() {
    let p = Platform::new();
    let mut started = NewMatch::dummy(dec(20), dec(37));
    started.start_time = Some(chrono::Utc::now() - chrono::Duration::seconds(1));
    let late = p.escrow.create_match(p.admin, started).unwrap();
    let open = p
        .escrow
        .create_match(p.admin, NewMatch::dummy(dec(20), dec(37)))
        .unwrap();
    let user = p.player(dec(50));

    assert!(matches!(
        p.escrow.join_match(late, user).unwrap_err(),
        LedgerError::MatchStarted(_)
    ));
    p.escrow.join_match(open, user).unwrap();
    assert!(matches!(
        p.escrow.join_match(open, user).unwrap_err(),
        LedgerError::AlreadyJoined { .. }
    ));
    assert_eq!(p.pools(user), (dec(30), dec(20)));

    p.escrow.settle_match(open, user, p.admin).unwrap();
    let newcomer = p.player(dec(50));
    assert!(matches!(
        p.escrow.join_match(open, newcomer).unwrap_err(),
        LedgerError::MatchClosed(_)
    ));
    assert_eq!(p.pools(newcomer), (dec(50), Decimal::ZERO));
}

#[test]
fn non_admin_cannot_create_or_settle() {
    let p = Platform::new();
    let player = p.player(dec(50));
    assert!(matches!(
        p.escrow
            .create_match(player, NewMatch::dummy(dec(20), dec(37)))
            .unwrap_err(),
        LedgerError::Forbidden(_)
    ));

    let m = p
        .escrow
        .create_match(p.admin, NewMatch::dummy(dec(20), dec(37)))
        .unwrap();
    p.escrow.join_match(m, player).unwrap();
    assert!(matches!(
        p.escrow.settle_match(m, player, player).unwrap_err(),
        LedgerError::Forbidden(_)
    ));
    assert_eq!(p.pools(player), (dec(30), dec(20)));
}
