#[cfg(feature = "smtp-sender")]
use std::time::Duration;

#[cfg(feature = "smtp-sender")]
use mailmerge_lib::{
    CampaignSettings, Credential, Dispatcher, LogObserver, RenderedRecipient, Smtp, SmtpConfig,
};

#[cfg(feature = "smtp-sender")]
fn campaign_settings() -> CampaignSettings {
    CampaignSettings {
        sender: "alice@mail.test".into(),
        login: Some("alice@localhost".into()),
        credential: Credential::Cmd("echo 'password'".into()),
        subject: "Plain message!".into(),
        body: "Plain message!".into(),
        cc: Some("carol@mail.test".into()),
        ..CampaignSettings::default()
    }
}

#[cfg(feature = "smtp-sender")]
#[test]
fn test_smtp_campaign_settings_are_valid() {
    let settings = campaign_settings();
    assert!(settings.validate().is_ok());
    assert_eq!("alice@localhost", settings.login());
    assert!(mailmerge_lib::is_valid_email(settings.cc.as_deref().unwrap()));
}

#[cfg(feature = "smtp-sender")]
#[test]
#[ignore = "requires a local SMTP server listening on port 3025"]
fn test_smtp_sender() {
    let _ = env_logger::builder().is_test(true).try_init();

    let smtp = Smtp::new(SmtpConfig {
        host: "localhost".into(),
        port: 3025,
        ssl: Some(false),
        starttls: Some(false),
        insecure: Some(true),
        ..SmtpConfig::default()
    });

    let settings = campaign_settings();
    let recipients = vec![RenderedRecipient {
        email: "bob@mail.test".into(),
        subject: "Plain message!".into(),
        body: "Plain message!".into(),
        row: 1,
    }];

    let report = Dispatcher::new(smtp)
        .delay(Duration::ZERO)
        .run(&settings, &recipients, &mut LogObserver)
        .unwrap();

    assert_eq!(1, report.tally.sent);
    assert_eq!(0, report.tally.failed);
}
