//! End-to-end registry behaviour across both currency strategies

use std::sync::Arc;

use lineage_core::{Address, Amount, Currency, RegistryError, RegistryEvent};
use lineage_economics::{
    CurrencyStrategy, ExternalToken, FeeConfig, PriceQuote, StaticPriceOracle, TokenLedger,
};
use lineage_registry::{InMemoryPayout, NamePolicy, NameRegistry, RegistryState, TokenSettlement};
use proptest::prelude::*;

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

fn native(policy: NamePolicy) -> (NameRegistry, Arc<InMemoryPayout>) {
    let payout = Arc::new(InMemoryPayout::new());
    let fees = FeeConfig::new(15, 1, CurrencyStrategy::Native).unwrap();
    let registry = NameRegistry::native(addr("admin"), fees, policy, payout.clone()).unwrap();
    (registry, payout)
}

struct DualFixture {
    registry: NameRegistry,
    token: Arc<TokenLedger>,
    oracle: Arc<StaticPriceOracle>,
    account: Address,
}

fn dual() -> DualFixture {
    let token = Arc::new(TokenLedger::new("USDX", 6));
    let oracle = Arc::new(StaticPriceOracle::new(PriceQuote::new(2000_00000000, 8)));
    let account = addr("registry");
    let settlement = TokenSettlement::new(token.clone(), oracle.clone(), account);
    let fees = FeeConfig::new(15, 1, CurrencyStrategy::Dual).unwrap();
    let registry = NameRegistry::dual(
        addr("admin"),
        fees,
        NamePolicy::default(),
        Arc::new(InMemoryPayout::new()),
        settlement,
    )
    .unwrap();
    DualFixture {
        registry,
        token,
        oracle,
        account,
    }
}

#[test]
fn three_level_reward_scenario() {
    let (registry, payout) = native(NamePolicy::default());
    let (x, y, z) = (addr("x"), addr("y"), addr("z"));

    registry.register(&x, "com", 15).unwrap();
    registry.register(&y, "org.com", 15).unwrap();
    registry.register(&z, "ua.org.com", 15).unwrap();

    assert_eq!(registry.reward_balance_of(Currency::Native, &x), 1);
    assert_eq!(registry.reward_balance_of(Currency::Native, &y), 1);
    assert_eq!(registry.reward_balance_of(Currency::Native, &z), 0);
    assert_eq!(registry.total_outstanding_rewards(Currency::Native), 2);

    assert_eq!(registry.withdraw_reward(&y, Currency::Native).unwrap(), 1);
    assert_eq!(payout.paid_to(&y), 1);
    assert_eq!(registry.reward_balance_of(Currency::Native, &y), 0);
    assert_eq!(registry.reward_balance_of(Currency::Native, &x), 1);
    assert_eq!(registry.total_outstanding_rewards(Currency::Native), 1);

    assert_eq!(
        registry.withdraw_reward(&y, Currency::Native),
        Err(RegistryError::NothingToWithdraw)
    );
}

#[test]
fn events_follow_committed_effects() {
    let (registry, _) = native(NamePolicy::default());
    registry.register(&addr("x"), "com", 15).unwrap();
    registry.register(&addr("y"), "org.com", 15).unwrap();
    let _ = registry.register(&addr("z"), "org.com", 15);

    let events: Vec<RegistryEvent> = registry.drain_events().into_iter().map(|r| r.event).collect();
    assert_eq!(
        events,
        vec![
            RegistryEvent::NameRegistered {
                name: "com".into(),
                holder: addr("x")
            },
            RegistryEvent::NameRegistered {
                name: "org.com".into(),
                holder: addr("y")
            },
            RegistryEvent::RewardAccrued {
                ancestor_name: "com".into(),
                holder: addr("x"),
                amount: 1,
                new_balance: 1,
                currency: Currency::Native,
            },
        ]
    );
    assert!(registry.events().is_empty());
}

#[test]
fn holder_registering_child_of_own_name_is_rewarded_as_ancestor() {
    let (registry, _) = native(NamePolicy::default());
    let x = addr("x");
    registry.register(&x, "com", 15).unwrap();
    registry.register(&x, "mine.com", 15).unwrap();

    // the reward goes to com's holder, never to the new name itself
    assert_eq!(registry.reward_balance_of(Currency::Native, &x), 1);
    assert_eq!(registry.total_outstanding_rewards(Currency::Native), 1);
}

#[test]
fn top_level_names_earn_nothing() {
    let (registry, _) = native(NamePolicy::default());
    registry.register(&addr("x"), "com", 15).unwrap();
    registry.register(&addr("y"), "org", 15).unwrap();
    registry.register(&addr("z"), "a.b.net", 15).unwrap();
    assert_eq!(registry.total_outstanding_rewards(Currency::Native), 0);
}

#[test]
fn strict_lookup_fails_for_unknown_names() {
    let (registry, _) = native(NamePolicy {
        max_name_length: Some(32),
        strict_lookup: true,
    });
    registry.register(&addr("x"), "com", 15).unwrap();

    assert_eq!(registry.holder_of("com").unwrap(), Some(addr("x")));
    assert_eq!(
        registry.holder_of("org"),
        Err(RegistryError::NotRegistered("org".to_string()))
    );
}

#[test]
fn failed_reward_payout_is_not_recredited() {
    let (registry, payout) = native(NamePolicy::default());
    let x = addr("x");
    registry.register(&x, "com", 15).unwrap();
    registry.register(&addr("y"), "org.com", 15).unwrap();

    payout.set_failing(true);
    assert_eq!(
        registry.withdraw_reward(&x, Currency::Native),
        Err(RegistryError::WithdrawFailed { amount: 1 })
    );
    assert_eq!(registry.reward_balance_of(Currency::Native, &x), 0);
    assert_eq!(registry.total_outstanding_rewards(Currency::Native), 0);
    // the unpaid reward stays in custody and becomes withdrawable as fees
    assert_eq!(registry.native_custody(), 30);

    payout.set_failing(false);
    assert_eq!(registry.withdraw_collected_fees(&addr("admin")).unwrap(), 30);
}

#[test]
fn admin_transfer_moves_privileges() {
    let (registry, payout) = native(NamePolicy::default());
    let (admin, next) = (addr("admin"), addr("next"));
    registry.register(&addr("x"), "com", 15).unwrap();

    registry.transfer_admin(&admin, next).unwrap();
    assert_eq!(registry.admin(), next);
    assert_eq!(
        registry.withdraw_collected_fees(&admin),
        Err(RegistryError::Unauthorized)
    );
    assert_eq!(registry.withdraw_collected_fees(&next).unwrap(), 15);
    assert_eq!(payout.paid_to(&next), 15);
}

#[test]
fn snapshot_restores_into_equivalent_registry() {
    let (registry, _) = native(NamePolicy::default());
    registry.register(&addr("x"), "com", 15).unwrap();
    registry.register(&addr("y"), "org.com", 15).unwrap();

    let state = RegistryState::from_snapshot(registry.snapshot()).unwrap();
    let restored = NameRegistry::new(state, Arc::new(InMemoryPayout::new()), None).unwrap();

    assert_eq!(restored.registrations(), registry.registrations());
    assert_eq!(restored.reward_balance_of(Currency::Native, &addr("x")), 1);
    assert_eq!(
        restored.register(&addr("z"), "org.com", 15),
        Err(RegistryError::DuplicateName("org.com".to_string()))
    );
}

#[test]
fn token_registration_pays_in_tokens() {
    let f = dual();
    let (x, y) = (addr("x"), addr("y"));
    f.token.mint(&x, 100).unwrap();
    f.token.mint(&y, 100).unwrap();

    f.registry.register_with_token(&x, "com").unwrap();
    f.registry.register_with_token(&y, "org.com").unwrap();

    assert_eq!(f.token.balance_of(&x), 85);
    assert_eq!(f.token.balance_of(&f.account), 30);
    assert_eq!(f.registry.reward_balance_of(Currency::Token, &x), 1);
    assert_eq!(f.registry.reward_balance_of(Currency::Native, &x), 0);

    assert_eq!(f.registry.withdraw_reward(&x, Currency::Token).unwrap(), 1);
    assert_eq!(f.token.balance_of(&x), 86);

    let admin = addr("admin");
    assert_eq!(f.registry.withdraw_collected_token_fees(&admin).unwrap(), 29);
    assert_eq!(f.token.balance_of(&admin), 29);
    assert_eq!(
        f.registry.withdraw_collected_token_fees(&admin),
        Err(RegistryError::NothingToWithdraw)
    );
}

#[test]
fn token_registration_needs_balance() {
    let f = dual();
    let x = addr("x");
    f.token.mint(&x, 14).unwrap();

    assert_eq!(
        f.registry.register_with_token(&x, "com"),
        Err(RegistryError::InsufficientExternalBalance {
            required: 15,
            available: 14
        })
    );
    assert!(!f.registry.is_registered("com"));
}

#[test]
fn settlement_account_cannot_register_with_token() {
    let f = dual();
    f.token.mint(&f.account, 100).unwrap();

    assert_eq!(
        f.registry.register_with_token(&f.account, "com"),
        Err(RegistryError::SettlementAccountCaller)
    );
    assert!(!f.registry.is_registered("com"));
    assert_eq!(f.token.balance_of(&f.account), 100);
    assert!(f.registry.events().is_empty());
}

#[test]
fn failed_token_pull_leaves_no_trace() {
    let f = dual();
    let (x, y) = (addr("x"), addr("y"));
    f.token.mint(&x, 100).unwrap();
    f.token.mint(&y, 100).unwrap();
    f.registry.register_with_token(&x, "com").unwrap();

    f.token.freeze(&y);
    assert_eq!(
        f.registry.register_with_token(&y, "org.com"),
        Err(RegistryError::TransferFailed { amount: 15 })
    );
    assert!(!f.registry.is_registered("org.com"));
    assert_eq!(f.registry.reward_balance_of(Currency::Token, &x), 0);
    assert_eq!(f.token.balance_of(&y), 100);

    f.token.thaw(&y);
    f.registry.register_with_token(&y, "org.com").unwrap();
    assert_eq!(f.registry.reward_balance_of(Currency::Token, &x), 1);
}

#[test]
fn oracle_price_change_moves_native_fee() {
    let f = dual();
    let before = f.registry.quote_fee().unwrap();
    f.oracle.set_price(PriceQuote::new(3000_00000000, 8));
    let after = f.registry.quote_fee().unwrap();

    // 15 reference units at 6 decimals
    assert_eq!(before, 15 * 1_000_000_000_000_000_000 / 2_000_000_000);
    assert_eq!(after, 15 * 1_000_000_000_000_000_000 / 3_000_000_000);

    assert!(matches!(
        f.registry.register(&addr("x"), "com", before),
        Err(RegistryError::FeeMismatch { .. })
    ));
    f.registry.register(&addr("x"), "com", after).unwrap();
}

#[test]
fn invalid_oracle_price_blocks_native_registration() {
    let f = dual();
    f.oracle.set_price(PriceQuote::new(0, 8));
    assert_eq!(
        f.registry.register(&addr("x"), "com", 1),
        Err(RegistryError::OraclePriceInvalid(0))
    );
    assert!(!f.registry.is_registered("com"));

    // token registration does not consult the oracle
    f.token.mint(&addr("x"), 15).unwrap();
    f.registry.register_with_token(&addr("x"), "com").unwrap();
}

fn label() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c"]).prop_map(str::to_string)
}

fn dotted_name() -> impl Strategy<Value = String> {
    prop::collection::vec(label(), 1..4).prop_map(|labels| labels.join("."))
}

proptest! {
    #[test]
    fn prop_conservation_and_uniqueness(
        ops in prop::collection::vec((dotted_name(), 0u8..4), 1..40)
    ) {
        let (registry, _) = native(NamePolicy::default());
        let holders: Vec<Address> = (0..4).map(|i| addr(&format!("h{i}"))).collect();

        let mut accepted = 0usize;
        for (name, who) in &ops {
            let holder = holders[*who as usize];
            match registry.register(&holder, name, 15) {
                Ok(()) => accepted += 1,
                Err(err) => prop_assert_eq!(err, RegistryError::DuplicateName(name.clone())),
            }
        }
        prop_assert_eq!(registry.registration_count(), accepted);

        let sum: u128 = holders
            .iter()
            .map(|h| registry.reward_balance_of(Currency::Native, h))
            .sum();
        prop_assert_eq!(sum, registry.total_outstanding_rewards(Currency::Native));
        prop_assert!(registry.native_custody() >= sum);
    }
}

#[derive(Clone, Debug)]
enum Step {
    Register { name: String, who: usize, token: bool },
    WithdrawReward { who: usize, currency: Currency },
    WithdrawFees { currency: Currency },
}

fn currency() -> impl Strategy<Value = Currency> {
    prop_oneof![Just(Currency::Native), Just(Currency::Token)]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (dotted_name(), 0usize..4, any::<bool>())
            .prop_map(|(name, who, token)| Step::Register { name, who, token }),
        1 => (0usize..4, currency()).prop_map(|(who, currency)| Step::WithdrawReward { who, currency }),
        1 => currency().prop_map(|currency| Step::WithdrawFees { currency }),
    ]
}

proptest! {
    #[test]
    fn prop_withdrawals_only_touch_their_own_funds(
        steps in prop::collection::vec(step(), 1..40)
    ) {
        let f = dual();
        let admin = addr("admin");
        let holders: Vec<Address> = (0..4).map(|i| addr(&format!("h{i}"))).collect();
        for holder in &holders {
            f.token.mint(holder, 1_000).unwrap();
        }
        let balances = |currency: Currency| -> Vec<Amount> {
            holders
                .iter()
                .map(|h| f.registry.reward_balance_of(currency, h))
                .collect()
        };

        for step in &steps {
            let native_before = balances(Currency::Native);
            let token_before = balances(Currency::Token);

            match step {
                Step::Register { name, who, token } => {
                    let holder = holders[*who];
                    let result = if *token {
                        f.registry.register_with_token(&holder, name)
                    } else {
                        let fee = f.registry.quote_fee().unwrap();
                        f.registry.register(&holder, name, fee)
                    };
                    if let Err(err) = result {
                        prop_assert_eq!(err, RegistryError::DuplicateName(name.clone()));
                    }
                }
                Step::WithdrawReward { who, currency } => {
                    let before = balances(*currency);
                    match f.registry.withdraw_reward(&holders[*who], *currency) {
                        Ok(amount) => prop_assert_eq!(amount, before[*who]),
                        Err(err) => {
                            prop_assert_eq!(before[*who], 0);
                            prop_assert_eq!(err, RegistryError::NothingToWithdraw);
                        }
                    }
                    let after = balances(*currency);
                    for (i, (b, a)) in before.iter().zip(&after).enumerate() {
                        if i == *who {
                            prop_assert_eq!(*a, 0);
                        } else {
                            prop_assert_eq!(a, b);
                        }
                    }
                }
                Step::WithdrawFees { currency } => {
                    match currency {
                        Currency::Native => {
                            f.registry.withdraw_collected_fees(&admin).unwrap();
                            prop_assert_eq!(
                                f.registry.native_custody(),
                                f.registry.total_outstanding_rewards(Currency::Native)
                            );
                        }
                        Currency::Token => match f.registry.withdraw_collected_token_fees(&admin) {
                            Ok(_) => prop_assert_eq!(
                                f.token.balance_of(&f.account),
                                f.registry.total_outstanding_rewards(Currency::Token)
                            ),
                            Err(err) => prop_assert_eq!(err, RegistryError::NothingToWithdraw),
                        },
                    }
                    prop_assert_eq!(balances(Currency::Native), native_before);
                    prop_assert_eq!(balances(Currency::Token), token_before);
                }
            }

            prop_assert!(
                f.registry.native_custody() >= f.registry.total_outstanding_rewards(Currency::Native)
            );
            prop_assert!(
                f.token.balance_of(&f.account) >= f.registry.total_outstanding_rewards(Currency::Token)
            );
        }
    }
}
