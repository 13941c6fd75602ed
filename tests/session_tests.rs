//! Session recovery paths: machine auth, guarded logons, friends handling.

mod support;

use std::sync::Arc;

use droplord::bot::BotRegistry;
use droplord::platform::{
    Callback, ConnectResult, CredentialPrompt, FriendEntry, FriendRelationship, LogonResult,
    MachineAuthChunk,
};
use droplord::testkit::{PlatformOp, ScriptedPrompter};

use support::pages;

#[tokio::test(start_paused = true)]
async fn machine_auth_writes_sentry_and_replies_with_hash() {
    let data_dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(BotRegistry::new());
    let rig = support::make_bot_in(
        &registry,
        support::test_config("sentry"),
        data_dir.path().to_path_buf(),
    );

    rig.bot.start().await;
    rig.platform.send(Callback::MachineAuth {
        chunk: MachineAuthChunk {
            job_id: 1,
            file_name: "sentry.bin".to_string(),
            offset: 0,
            data: b"AAAA".to_vec(),
        },
    });
    support::wait_for("first chunk acknowledged", || {
        rig.platform.ops().iter().any(|op| {
            matches!(op, PlatformOp::MachineAuthResponse { offset: 0, bytes_written: 4 })
        })
    })
    .await;

    rig.platform.send(Callback::MachineAuth {
        chunk: MachineAuthChunk {
            job_id: 2,
            file_name: "sentry.bin".to_string(),
            offset: 4,
            data: b"BB".to_vec(),
        },
    });
    support::wait_for("second chunk acknowledged", || {
        rig.platform.ops().iter().any(|op| {
            matches!(op, PlatformOp::MachineAuthResponse { offset: 4, bytes_written: 2 })
        })
    })
    .await;

    let blob = std::fs::read(data_dir.path().join("sentry.bin")).unwrap();
    assert_eq!(blob, b"AAAABB");

    // The next logon carries the sentry hash.
    rig.platform.send(Callback::Connected {
        result: ConnectResult::Ok,
    });
    support::wait_for("logon with sentry", || {
        rig.platform.ops().iter().any(|op| {
            matches!(op, PlatformOp::LogOn { has_sentry_hash: true, .. })
        })
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn email_guard_code_is_captured_and_used_on_retry() {
    let registry = Arc::new(BotRegistry::new());
    let prompter = Arc::new(
        ScriptedPrompter::new().with_answer(CredentialPrompt::SteamGuardCode, "GUARD"),
    );
    let rig = support::make_bot_with_prompter(
        &registry,
        support::test_config("guarded"),
        prompter,
        std::env::temp_dir(),
    );

    rig.bot.start().await;
    rig.platform.send(Callback::Connected {
        result: ConnectResult::Ok,
    });
    support::wait_for("first logon", || {
        rig.platform
            .ops()
            .iter()
            .any(|op| matches!(op, PlatformOp::LogOn { .. }))
    })
    .await;

    rig.platform.send(Callback::LoggedOn {
        result: LogonResult::AccountLogonDenied,
        steam_id: support::ACCOUNT,
    });
    support::wait_for("code prompted", || {
        rig.prompter
            .asked()
            .contains(&CredentialPrompt::SteamGuardCode)
    })
    .await;

    // The platform drops the connection after a denied logon; the
    // reconnect cycle retries with the captured code.
    rig.platform.send(Callback::Disconnected);
    support::wait_for("reconnected", || rig.platform.connect_count() == 2).await;
    rig.platform.send(Callback::Connected {
        result: ConnectResult::Ok,
    });

    support::wait_for("retry carries code", || {
        rig.platform.ops().iter().any(|op| {
            matches!(
                op,
                PlatformOp::LogOn { auth_code: Some(code), .. } if code == "GUARD"
            )
        })
    })
    .await;

    let first_logon = rig
        .platform
        .ops()
        .into_iter()
        .find(|op| matches!(op, PlatformOp::LogOn { .. }));
    assert!(matches!(
        first_logon,
        Some(PlatformOp::LogOn { auth_code: None, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn invalid_password_backs_off_then_retries() {
    let registry = Arc::new(BotRegistry::new());
    let rig = support::make_bot(&registry, support::test_config("locked"));

    rig.bot.start().await;
    rig.platform.send(Callback::Connected {
        result: ConnectResult::Ok,
    });
    support::wait_for("first logon", || {
        rig.platform
            .ops()
            .iter()
            .any(|op| matches!(op, PlatformOp::LogOn { .. }))
    })
    .await;

    rig.platform.send(Callback::LoggedOn {
        result: LogonResult::InvalidPassword,
        steam_id: support::ACCOUNT,
    });

    // Stop, 25 minute back-off, fresh start.
    support::wait_for("reconnected after back-off", || {
        rig.platform.connect_count() == 2
    })
    .await;
    assert!(rig.bot.is_running());
}

#[tokio::test(start_paused = true)]
async fn fatal_logon_failure_shuts_the_bot_down() {
    let registry = Arc::new(BotRegistry::new());
    let rig = support::make_bot(&registry, support::test_config("fatal"));
    registry.insert_if_absent(Arc::clone(&rig.bot));

    rig.bot.start().await;
    rig.platform.send(Callback::Connected {
        result: ConnectResult::Ok,
    });
    support::wait_for("logon issued", || {
        rig.platform
            .ops()
            .iter()
            .any(|op| matches!(op, PlatformOp::LogOn { .. }))
    })
    .await;

    rig.platform.send(Callback::LoggedOn {
        result: LogonResult::Other("AccountDisabled".to_string()),
        steam_id: support::ACCOUNT,
    });

    support::wait_for("bot deregistered", || registry.count() == 0).await;
    assert!(!rig.bot.is_running());
}

#[tokio::test(start_paused = true)]
async fn friends_list_accepts_master_and_clears_the_rest() {
    let registry = Arc::new(BotRegistry::new());
    let rig = support::make_bot(&registry, support::test_config("social"));

    rig.web.set_badge_page(1, pages::empty_badge_page());
    support::drive_logon(&rig).await;

    let clan = droplord::domain::SteamId::new(103_000_000_000_000_001);
    let stranger = droplord::domain::SteamId::new(76_561_198_000_000_042);
    let existing = droplord::domain::SteamId::new(76_561_198_000_000_043);

    rig.platform.send(Callback::FriendsList {
        friends: vec![
            FriendEntry {
                id: clan,
                is_clan: true,
                relationship: FriendRelationship::RequestRecipient,
            },
            FriendEntry {
                id: support::MASTER,
                is_clan: false,
                relationship: FriendRelationship::RequestRecipient,
            },
            FriendEntry {
                id: stranger,
                is_clan: false,
                relationship: FriendRelationship::RequestRecipient,
            },
            FriendEntry {
                id: existing,
                is_clan: false,
                relationship: FriendRelationship::Friend,
            },
        ],
    });

    support::wait_for("friends handled", || {
        let ops = rig.platform.ops();
        ops.contains(&PlatformOp::DeclineClanInvite(clan))
            && ops.contains(&PlatformOp::AcceptFriend(support::MASTER))
            && ops.contains(&PlatformOp::RemoveFriend(stranger))
    })
    .await;

    // Existing friendships are left alone.
    assert!(!rig
        .platform
        .ops()
        .contains(&PlatformOp::RemoveFriend(existing)));
}

#[tokio::test(start_paused = true)]
async fn logon_applies_nickname_and_clan_chats() {
    let registry = Arc::new(BotRegistry::new());
    let mut config = support::test_config("styled");
    config.steam_nickname = Some("FancyName".to_string());
    config.master_clan_id = droplord::domain::SteamId::new(103_000_000_000_000_777);
    let rig = support::make_bot(&registry, config);

    rig.web.set_badge_page(1, pages::empty_badge_page());
    support::drive_logon(&rig).await;

    support::wait_for("persona and chats applied", || {
        let ops = rig.platform.ops();
        ops.contains(&PlatformOp::SetPersona("FancyName".to_string()))
            && ops.contains(&PlatformOp::JoinClanChat(droplord::domain::SteamId::new(
                103_000_000_000_000_777,
            )))
            && ops.contains(&PlatformOp::JoinClanChat(droplord::bot::STATISTICS_GROUP_ID))
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn interactive_credentials_are_prompted_once_and_cached() {
    let registry = Arc::new(BotRegistry::new());
    let prompter = Arc::new(
        ScriptedPrompter::new()
            .with_answer(CredentialPrompt::Login, "prompted-login")
            .with_answer(CredentialPrompt::Password, "prompted-password"),
    );
    let mut config = support::test_config("asking");
    config.steam_login = None;
    config.steam_password = None;
    let rig = support::make_bot_with_prompter(
        &registry,
        config,
        prompter,
        std::env::temp_dir(),
    );

    rig.bot.start().await;
    rig.platform.send(Callback::Connected {
        result: ConnectResult::Ok,
    });
    support::wait_for("prompted logon", || {
        rig.platform.ops().iter().any(|op| {
            matches!(op, PlatformOp::LogOn { username, .. } if username == "prompted-login")
        })
    })
    .await;

    // A reconnect reuses the cached answers instead of prompting again.
    rig.platform.send(Callback::Disconnected);
    support::wait_for("reconnected", || rig.platform.connect_count() == 2).await;
    rig.platform.send(Callback::Connected {
        result: ConnectResult::Ok,
    });
    support::wait_for("second logon", || {
        rig.platform
            .ops()
            .iter()
            .filter(|op| matches!(op, PlatformOp::LogOn { .. }))
            .count()
            == 2
    })
    .await;

    let asked = rig.prompter.asked();
    assert_eq!(
        asked
            .iter()
            .filter(|kind| **kind == CredentialPrompt::Login)
            .count(),
        1
    );
    assert_eq!(
        asked
            .iter()
            .filter(|kind| **kind == CredentialPrompt::Password)
            .count(),
        1
    );
}
