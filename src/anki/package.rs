//! Writes a deck as an `.apkg` archive importable by Anki and AnkiDroid.
//!
//! The archive holds a schema 11 `collection.anki2` SQLite database, a `media`
//! manifest mapping entry names to file names, and the media files themselves
//! stored under their manifest index.

use std::{
    collections::HashSet,
    fs::{
        self,
        File,
    },
    io::{
        self,
        Write,
    },
    path::Path,
};

use chrono::Utc;
use serde_json::{
    json,
    Map,
    Value,
};
use sha1::Sha1;
use sha2::{
    Digest,
    Sha256,
};
use sqlx::{
    sqlite::{
        SqliteConnectOptions,
        SqliteJournalMode,
    },
    ConnectOptions,
    Connection,
};
use tracing::{
    debug,
    warn,
};
use zip::{
    write::SimpleFileOptions,
    ZipWriter,
};

use super::deck::DeckPackage;
use crate::core::{
    utils::strip_html,
    TuneDeckError,
};

pub const MODEL_ID: i64 = 1607392319;
pub const MODEL_NAME: &str = "Irish Traditional Music";
pub const COLLECTION_ENTRY: &str = "collection.anki2";
pub const MEDIA_ENTRY: &str = "media";

const FIELD_SEPARATOR: char = '\x1f';
const DEFAULT_DECK_ID: i64 = 1;

const QUESTION_FORMAT: &str = "{{Front}}";
const ANSWER_FORMAT: &str = "{{FrontSide}}<hr id=\"answer\">{{Back}}";
const CARD_CSS: &str = ".card {\n font-family: arial;\n font-size: 20px;\n text-align: center;\n color: black;\n background-color: white;\n}\n";
const LATEX_PRE: &str = "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n";
const LATEX_POST: &str = "\\end{document}";

const SCHEMA: &str = r#"
CREATE TABLE col (
    id      integer primary key,
    crt     integer not null,
    mod     integer not null,
    scm     integer not null,
    ver     integer not null,
    dty     integer not null,
    usn     integer not null,
    ls      integer not null,
    conf    text not null,
    models  text not null,
    decks   text not null,
    dconf   text not null,
    tags    text not null
);
CREATE TABLE notes (
    id      integer primary key,
    guid    text not null,
    mid     integer not null,
    mod     integer not null,
    usn     integer not null,
    tags    text not null,
    flds    text not null,
    sfld    integer not null,
    csum    integer not null,
    flags   integer not null,
    data    text not null
);
CREATE TABLE cards (
    id      integer primary key,
    nid     integer not null,
    did     integer not null,
    ord     integer not null,
    mod     integer not null,
    usn     integer not null,
    type    integer not null,
    queue   integer not null,
    due     integer not null,
    ivl     integer not null,
    factor  integer not null,
    reps    integer not null,
    lapses  integer not null,
    left    integer not null,
    odue    integer not null,
    odid    integer not null,
    flags   integer not null,
    data    text not null
);
CREATE TABLE revlog (
    id      integer primary key,
    cid     integer not null,
    usn     integer not null,
    ease    integer not null,
    ivl     integer not null,
    lastIvl integer not null,
    factor  integer not null,
    time    integer not null,
    type    integer not null
);
CREATE TABLE graves (
    usn     integer not null,
    oid     integer not null,
    type    integer not null
);
CREATE INDEX ix_notes_usn on notes (usn);
CREATE INDEX ix_cards_usn on cards (usn);
CREATE INDEX ix_revlog_usn on revlog (usn);
CREATE INDEX ix_cards_nid on cards (nid);
CREATE INDEX ix_cards_sched on cards (did, queue, due);
CREATE INDEX ix_revlog_cid on revlog (cid);
CREATE INDEX ix_notes_csum on notes (csum);
"#;

const BASE91_TABLE: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#$%&()*+,-./:;<=>?@[]^_`{|}~";

/// Stable note GUID, identical to genanki's `guid_for(seed)`.
pub fn note_guid(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let mut value = u64::from_be_bytes(bytes);

    let base = BASE91_TABLE.len() as u64;
    let mut reversed = Vec::new();
    while value > 0 {
        reversed.push(BASE91_TABLE[(value % base) as usize] as char);
        value /= base;
    }
    reversed.iter().rev().collect()
}

/// Anki's duplicate-detection checksum over the sort field.
pub fn field_checksum(field: &str) -> i64 {
    let digest = Sha1::digest(strip_html(field).as_bytes());
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&digest[..4]);
    u32::from_be_bytes(bytes) as i64
}

struct Timestamps {
    secs: i64,
    millis: i64,
    day_start: i64,
}

impl Timestamps {
    fn now() -> Self {
        let now = Utc::now();
        let secs = now.timestamp();
        Self { secs, millis: now.timestamp_millis(), day_start: secs - secs.rem_euclid(86_400) }
    }
}

fn model_json(deck_id: i64, ts: &Timestamps) -> Value {
    let fields: Vec<Value> = ["Front", "Back"]
        .iter()
        .enumerate()
        .map(|(ord, name)| {
            json!({
                "font": "Arial",
                "media": [],
                "name": name,
                "ord": ord,
                "rtl": false,
                "size": 20,
                "sticky": false,
            })
        })
        .collect();

    json!({
        "css": CARD_CSS,
        "did": deck_id,
        "flds": fields,
        "id": MODEL_ID.to_string(),
        "latexPost": LATEX_POST,
        "latexPre": LATEX_PRE,
        "latexsvg": false,
        "mod": ts.secs,
        "name": MODEL_NAME,
        "req": [[0, "any", [0]]],
        "sortf": 0,
        "tags": [],
        "tmpls": [{
            "afmt": ANSWER_FORMAT,
            "bafmt": "",
            "bqfmt": "",
            "did": null,
            "name": "Card 1",
            "ord": 0,
            "qfmt": QUESTION_FORMAT,
        }],
        "type": 0,
        "usn": -1,
        "vers": [],
    })
}

fn deck_json(id: i64, name: &str, ts: &Timestamps) -> Value {
    json!({
        "collapsed": false,
        "conf": 1,
        "desc": "",
        "dyn": 0,
        "extendNew": 10,
        "extendRev": 50,
        "id": id,
        "lrnToday": [0, 0],
        "mod": ts.secs,
        "name": name,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "timeToday": [0, 0],
        "usn": -1,
    })
}

fn collection_json(package: &DeckPackage, ts: &Timestamps) -> (Value, Value, Value, Value) {
    let conf = json!({
        "activeDecks": [DEFAULT_DECK_ID],
        "addToCur": true,
        "collapseTime": 1200,
        "curDeck": DEFAULT_DECK_ID,
        "curModel": MODEL_ID.to_string(),
        "dueCounts": true,
        "estTimes": true,
        "newBury": true,
        "newSpread": 0,
        "nextPos": package.len() + 1,
        "sortBackwards": false,
        "sortType": "noteFld",
        "timeLim": 0,
    });

    let mut models = Map::new();
    models.insert(MODEL_ID.to_string(), model_json(package.deck_id, ts));

    let mut decks = Map::new();
    decks.insert(DEFAULT_DECK_ID.to_string(), deck_json(DEFAULT_DECK_ID, "Default", ts));
    decks.insert(package.deck_id.to_string(), deck_json(package.deck_id, &package.deck_name, ts));

    let dconf = json!({
        "1": {
            "autoplay": true,
            "id": 1,
            "lapse": { "delays": [10], "leechAction": 0, "leechFails": 8, "minInt": 1, "mult": 0 },
            "maxTaken": 60,
            "mod": 0,
            "name": "Default",
            "new": {
                "bury": true,
                "delays": [1, 10],
                "initialFactor": 2500,
                "ints": [1, 4, 7],
                "order": 1,
                "perDay": 20,
                "separate": true,
            },
            "replayq": true,
            "rev": {
                "bury": true,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "minSpace": 1,
                "perDay": 100,
            },
            "timer": 0,
            "usn": 0,
        }
    });

    (conf, Value::Object(models), Value::Object(decks), dconf)
}

async fn write_collection(
    db_path: &Path,
    package: &DeckPackage,
    ts: &Timestamps,
) -> Result<(), TuneDeckError> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);
    let mut conn = options.connect().await?;

    sqlx::raw_sql(SCHEMA).execute(&mut conn).await?;

    let (conf, models, decks, dconf) = collection_json(package, ts);
    let mut tx = conn.begin().await?;

    sqlx::query("INSERT INTO col VALUES (NULL, ?, ?, ?, 11, 0, 0, 0, ?, ?, ?, ?, '{}')")
        .bind(ts.day_start)
        .bind(ts.millis)
        .bind(ts.millis)
        .bind(conf.to_string())
        .bind(models.to_string())
        .bind(decks.to_string())
        .bind(dconf.to_string())
        .execute(&mut *tx)
        .await?;

    let card_id_base = ts.millis + package.len() as i64;
    for (position, record) in package.records().iter().enumerate() {
        let note_id = ts.millis + position as i64;
        let fields = format!("{}{}{}", record.front, FIELD_SEPARATOR, record.back);

        sqlx::query("INSERT INTO notes VALUES (?, ?, ?, ?, -1, ?, ?, ?, ?, 0, '')")
            .bind(note_id)
            .bind(note_guid(&record.guid_seed))
            .bind(MODEL_ID)
            .bind(ts.secs)
            .bind(format!(" {} ", record.tag))
            .bind(fields)
            .bind(record.front.as_str())
            .bind(field_checksum(&record.front))
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO cards VALUES (?, ?, ?, 0, ?, -1, 0, 0, ?, 0, 0, 0, 0, 0, 0, 0, 0, '')",
        )
        .bind(card_id_base + position as i64)
        .bind(note_id)
        .bind(package.deck_id)
        .bind(ts.secs)
        .bind(position as i64 + 1)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    conn.close().await?;
    Ok(())
}

/// Writes `package` to `output` as an `.apkg` file.
///
/// Media files sharing a file name are stored once; Anki keeps media in a
/// single flat folder so the later copies could not be told apart anyway.
pub fn write_package(package: &DeckPackage, output: &Path) -> Result<(), TuneDeckError> {
    let staging = tempfile::tempdir()?;
    let db_path = staging.path().join(COLLECTION_ENTRY);
    let ts = Timestamps::now();

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(write_collection(&db_path, package, &ts))?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut zip = ZipWriter::new(File::create(output)?);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(COLLECTION_ENTRY, options)?;
    zip.write_all(&fs::read(&db_path)?)?;

    let mut manifest = Map::new();
    let mut seen = HashSet::new();
    for (record, media_path) in package.records().iter().zip(package.media()) {
        if !seen.insert(record.media_file.as_str()) {
            warn!("Duplicate media file name '{}', keeping the first copy", record.media_file);
            continue;
        }

        let index = manifest.len().to_string();
        zip.start_file(index.as_str(), options)?;
        let mut source = File::open(media_path)?;
        io::copy(&mut source, &mut zip)?;
        manifest.insert(index, Value::String(record.media_file.clone()));
    }

    zip.start_file(MEDIA_ENTRY, options)?;
    zip.write_all(Value::Object(manifest).to_string().as_bytes())?;
    zip.finish()?;

    debug!("Wrote {} notes to {}", package.len(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        io::Read,
        path::PathBuf,
    };

    use sqlx::{
        Row,
        SqliteConnection,
    };

    use super::*;
    use crate::anki::deck::FlashcardRecord;

    fn record(name: &str, tag: &str) -> FlashcardRecord {
        FlashcardRecord {
            front: format!("[sound:{}]", name),
            back: format!("{}<br>{}", name, tag),
            media_file: name.to_string(),
            guid_seed: format!("{}_{}", tag, name),
            tag: tag.to_string(),
        }
    }

    fn sample_package(dir: &Path) -> DeckPackage {
        let mut package = DeckPackage::new("Session Tunes", 1_234_567_890);
        for (name, tag, bytes) in [
            ("Kesh (Gmaj).mp3", "jig", b"kesh".as_slice()),
            ("Silver Spear (Dmaj).mp3", "reel", b"spear".as_slice()),
        ] {
            let path = dir.join(name);
            fs::write(&path, bytes).unwrap();
            package.push(record(name, tag), path);
        }
        package
    }

    fn read_entry(archive: &mut zip::ZipArchive<File>, name: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        archive.by_name(name).unwrap().read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_note_guid_matches_genanki() {
        let guid = note_guid("reel_the_musical_priest");
        // genanki.guid_for("reel_the_musical_priest")
        assert_eq!(guid, "FTJI}P+_MS");
        assert!(guid.bytes().all(|b| BASE91_TABLE.contains(&b)));
        assert_eq!(guid, note_guid("reel_the_musical_priest"));
        assert_ne!(guid, note_guid("jig_the_musical_priest"));
    }

    #[test]
    fn test_field_checksum_ignores_markup() {
        assert_eq!(field_checksum("<b>abc</b>"), field_checksum("abc"));
        // sha1("abc") = a9993e36...
        assert_eq!(field_checksum("abc"), 0xa9993e36);
    }

    #[test]
    fn test_write_package_layout() {
        let dir = tempfile::tempdir().unwrap();
        let package = sample_package(dir.path());
        let output: PathBuf = dir.path().join("out").join("deck.apkg");

        write_package(&package, &output).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let manifest: Value = serde_json::from_slice(&read_entry(&mut archive, MEDIA_ENTRY)).unwrap();
        assert_eq!(manifest, json!({ "0": "Kesh (Gmaj).mp3", "1": "Silver Spear (Dmaj).mp3" }));
        assert_eq!(read_entry(&mut archive, "0"), b"kesh");
        assert_eq!(read_entry(&mut archive, "1"), b"spear");

        let db_path = dir.path().join("collection.anki2");
        fs::write(&db_path, read_entry(&mut archive, COLLECTION_ENTRY)).unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let mut conn: SqliteConnection =
                SqliteConnectOptions::new().filename(&db_path).connect().await.unwrap();

            let notes = sqlx::query("SELECT guid, mid, tags, flds, sfld FROM notes ORDER BY id")
                .fetch_all(&mut conn)
                .await
                .unwrap();
            assert_eq!(notes.len(), 2);
            assert_eq!(notes[0].get::<i64, _>("mid"), MODEL_ID);
            assert_eq!(notes[0].get::<String, _>("tags"), " jig ");
            assert_eq!(notes[0].get::<String, _>("guid"), note_guid("jig_Kesh (Gmaj).mp3"));
            assert_eq!(
                notes[1].get::<String, _>("flds"),
                "[sound:Silver Spear (Dmaj).mp3]\x1fSilver Spear (Dmaj).mp3<br>reel"
            );

            let cards = sqlx::query("SELECT did, due, type, queue FROM cards ORDER BY due")
                .fetch_all(&mut conn)
                .await
                .unwrap();
            assert_eq!(cards.len(), 2);
            assert_eq!(cards[0].get::<i64, _>("did"), 1_234_567_890);
            assert_eq!(cards[1].get::<i64, _>("due"), 2);
            assert_eq!(cards[0].get::<i64, _>("queue"), 0);

            let (models, decks): (String, String) =
                sqlx::query_as("SELECT models, decks FROM col").fetch_one(&mut conn).await.unwrap();
            let models: Value = serde_json::from_str(&models).unwrap();
            let decks: Value = serde_json::from_str(&decks).unwrap();
            assert_eq!(models["1607392319"]["name"], MODEL_NAME);
            assert_eq!(models["1607392319"]["tmpls"][0]["qfmt"], QUESTION_FORMAT);
            assert_eq!(decks["1234567890"]["name"], "Session Tunes");
        });
    }

    #[test]
    fn test_duplicate_media_stored_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut package = sample_package(dir.path());
        let again = package.media()[0].clone();
        package.push(record("Kesh (Gmaj).mp3", "slide"), again);
        let output = dir.path().join("deck.apkg");

        write_package(&package, &output).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let manifest: Value = serde_json::from_slice(&read_entry(&mut archive, MEDIA_ENTRY)).unwrap();
        assert_eq!(manifest.as_object().unwrap().len(), 2);
        assert!(archive.by_name("2").is_err());
    }
}
