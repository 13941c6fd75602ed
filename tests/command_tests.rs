//! Master chat command handling across bots.

mod support;

use std::sync::Arc;

use droplord::bot::BotRegistry;
use droplord::platform::{Callback, PurchaseResult};

use support::pages;

fn chat(message: &str) -> Callback {
    Callback::ChatMessage {
        from: support::MASTER,
        message: message.to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn redeem_on_named_bot_replies_with_purchase_result() {
    let registry = Arc::new(BotRegistry::new());
    let receiver = support::make_bot(&registry, support::test_config("alpha"));
    let target = support::make_bot(&registry, support::test_config("beta"));
    registry.insert_if_absent(Arc::clone(&receiver.bot));
    registry.insert_if_absent(Arc::clone(&target.bot));

    receiver.web.set_badge_page(1, pages::empty_badge_page());
    target.web.set_badge_page(1, pages::empty_badge_page());
    support::drive_logon(&receiver).await;
    support::drive_logon(&target).await;

    receiver
        .platform
        .send(chat("!redeem beta ABCDE-FGHIJ-KLMNO"));
    support::wait_for("key forwarded to beta", || {
        !target.platform.redeemed_keys().is_empty()
    })
    .await;
    assert_eq!(target.platform.redeemed_keys(), vec!["ABCDE-FGHIJ-KLMNO"]);

    target.platform.send(Callback::PurchaseResponse {
        result: PurchaseResult::Ok,
        items: vec!["Pack".to_string()],
    });

    support::wait_for("reply sent to master", || {
        receiver
            .platform
            .sent_messages()
            .iter()
            .any(|(to, message)| {
                *to == support::MASTER && message == "beta answer: Status: OK | Items: Pack"
            })
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn redeem_reply_times_out_without_purchase_response() {
    let registry = Arc::new(BotRegistry::new());
    let receiver = support::make_bot(&registry, support::test_config("alpha"));
    let target = support::make_bot(&registry, support::test_config("beta"));
    registry.insert_if_absent(Arc::clone(&receiver.bot));
    registry.insert_if_absent(Arc::clone(&target.bot));

    receiver.web.set_badge_page(1, pages::empty_badge_page());
    target.web.set_badge_page(1, pages::empty_badge_page());
    support::drive_logon(&receiver).await;
    support::drive_logon(&target).await;

    receiver
        .platform
        .send(chat("!redeem beta ABCDE-FGHIJ-KLMNO"));

    support::wait_for("timeout reply sent", || {
        receiver
            .platform
            .sent_messages()
            .iter()
            .any(|(_, message)| message == "beta answer: Status: Timeout")
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn key_list_fans_out_one_key_per_bot_in_name_order() {
    let registry = Arc::new(BotRegistry::new());
    let alpha = support::make_bot(&registry, support::test_config("alpha"));
    let beta = support::make_bot(&registry, support::test_config("beta"));
    registry.insert_if_absent(Arc::clone(&alpha.bot));
    registry.insert_if_absent(Arc::clone(&beta.bot));

    alpha.web.set_badge_page(1, pages::empty_badge_page());
    beta.web.set_badge_page(1, pages::empty_badge_page());
    support::drive_logon(&alpha).await;
    support::drive_logon(&beta).await;

    alpha
        .platform
        .send(chat("-AAAAA-BBBBB-CCCCC\n-DDDDD-EEEEE-FFFFF\n-GGGGG-HHHHH-IIIII"));

    support::wait_for("alpha redeemed", || {
        !alpha.platform.redeemed_keys().is_empty()
    })
    .await;
    alpha.platform.send(Callback::PurchaseResponse {
        result: PurchaseResult::Ok,
        items: vec![],
    });

    support::wait_for("beta redeemed", || {
        !beta.platform.redeemed_keys().is_empty()
    })
    .await;
    beta.platform.send(Callback::PurchaseResponse {
        result: PurchaseResult::AlreadyPossessed,
        items: vec![],
    });

    support::wait_for("combined reply", || {
        alpha.platform.sent_messages().iter().any(|(_, message)| {
            message.contains("alpha answer: Status: OK")
                && message.contains("beta answer: Status: AlreadyPossessed")
        })
    })
    .await;

    // One key per bot: the third key is never distributed.
    assert_eq!(alpha.platform.redeemed_keys(), vec!["AAAAA-BBBBB-CCCCC"]);
    assert_eq!(beta.platform.redeemed_keys(), vec!["DDDDD-EEEEE-FFFFF"]);
}

#[tokio::test(start_paused = true)]
async fn bare_key_is_redeemed_silently() {
    let registry = Arc::new(BotRegistry::new());
    let rig = support::make_bot(&registry, support::test_config("silent"));
    registry.insert_if_absent(Arc::clone(&rig.bot));

    rig.web.set_badge_page(1, pages::empty_badge_page());
    support::drive_logon(&rig).await;
    let messages_before = rig.platform.sent_messages().len();

    rig.platform.send(chat("ABCDE-FGHIJ-KLMNO"));
    support::wait_for("key redeemed", || !rig.platform.redeemed_keys().is_empty()).await;

    // No acknowledgement for a bare key.
    assert_eq!(rig.platform.sent_messages().len(), messages_before);
}

#[tokio::test(start_paused = true)]
async fn redeem_on_inactive_bot_reports_it() {
    let registry = Arc::new(BotRegistry::new());
    let receiver = support::make_bot(&registry, support::test_config("alpha"));
    let sleeping = support::make_bot(&registry, support::test_config("zeta"));
    registry.insert_if_absent(Arc::clone(&receiver.bot));
    registry.insert_if_absent(Arc::clone(&sleeping.bot));

    receiver.web.set_badge_page(1, pages::empty_badge_page());
    support::drive_logon(&receiver).await;

    receiver
        .platform
        .send(chat("!redeem zeta ABCDE-FGHIJ-KLMNO"));

    support::wait_for("inactive reply", || {
        receiver.platform.sent_messages().iter().any(|(_, message)| {
            message == "zeta answer: Bot is inactive and can't activate keys"
        })
    })
    .await;
    assert!(sleeping.platform.redeemed_keys().is_empty());
}

#[tokio::test(start_paused = true)]
async fn status_commands_report_bots() {
    let registry = Arc::new(BotRegistry::new());
    let rig = support::make_bot(&registry, support::test_config("stats"));
    registry.insert_if_absent(Arc::clone(&rig.bot));

    rig.web.set_badge_page(1, pages::empty_badge_page());
    support::drive_logon(&rig).await;

    rig.platform.send(chat("!status"));
    support::wait_for("own status", || {
        rig.platform
            .sent_messages()
            .iter()
            .any(|(_, message)| message.starts_with("Bot stats is"))
    })
    .await;

    rig.platform.send(chat("!status all"));
    support::wait_for("all statuses", || {
        rig.platform
            .sent_messages()
            .iter()
            .filter(|(_, message)| message.starts_with("Bot stats is"))
            .count()
            >= 2
    })
    .await;

    rig.platform.send(chat("!status nobody"));
    support::wait_for("unknown bot reported", || {
        rig.platform
            .sent_messages()
            .iter()
            .any(|(_, message)| message == "Couldn't find any bot named nobody!")
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn unknown_commands_get_an_error_reply() {
    let registry = Arc::new(BotRegistry::new());
    let rig = support::make_bot(&registry, support::test_config("strict"));
    registry.insert_if_absent(Arc::clone(&rig.bot));

    rig.web.set_badge_page(1, pages::empty_badge_page());
    support::drive_logon(&rig).await;

    rig.platform.send(chat("!bogus"));
    support::wait_for("error reply", || {
        rig.platform
            .sent_messages()
            .iter()
            .any(|(_, message)| message.starts_with("Unrecognized command"))
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn chat_from_non_master_is_ignored() {
    let registry = Arc::new(BotRegistry::new());
    let rig = support::make_bot(&registry, support::test_config("guarded"));
    registry.insert_if_absent(Arc::clone(&rig.bot));

    rig.web.set_badge_page(1, pages::empty_badge_page());
    support::drive_logon(&rig).await;
    let ops_before = rig.platform.ops().len();

    rig.platform.send(Callback::ChatMessage {
        from: support::ACCOUNT,
        message: "!exit".to_string(),
    });
    // Give the pump time to (not) act on it.
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;

    assert_eq!(rig.platform.ops().len(), ops_before);
}

#[tokio::test(start_paused = true)]
async fn stop_command_replies_then_shuts_down() {
    let registry = Arc::new(BotRegistry::new());
    let rig = support::make_bot(&registry, support::test_config("stoppable"));
    registry.insert_if_absent(Arc::clone(&rig.bot));

    rig.web.set_badge_page(1, pages::empty_badge_page());
    support::drive_logon(&rig).await;

    rig.platform.send(chat("!stop"));
    support::wait_for("bot deregistered", || registry.count() == 0).await;
    assert!(!rig.bot.is_running());
    assert!(rig
        .platform
        .sent_messages()
        .iter()
        .any(|(_, message)| message == "Done!"));
}
