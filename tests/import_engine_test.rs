// ==========================================
// 导入引擎集成测试
// ==========================================
// 测试目标: CSV 文件 → 模板 → SQLite 的完整导入流程
// 覆盖: 转换/校验/隐藏字段回引/更新键/批次标签
// ==========================================

use data_import_engine::config::{ImportOptions, ReaderOptions, RunContext};
use data_import_engine::domain::profile::{
    ColumnMapping, ConversionRule, FieldRef, FieldSpec, HiddenField, HiddenValue, ImportProfile,
    LookupTarget, TableTarget, ValidationRule,
};
use data_import_engine::domain::run_result::IssueKind;
use data_import_engine::domain::CodeKind;
use data_import_engine::importer::ImportRunner;
use data_import_engine::logging;
use data_import_engine::repository::{
    CodeSeries, PersistenceStore, SqlValue, SqliteEntityLookup, SqliteStore,
};
use rusqlite::Connection;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

/// 创建测试数据库（客户主表 + 扩展表 + 两张字典表）
fn create_test_db(dir: &TempDir) -> String {
    let db_path = dir.path().join("import_test.db").display().to_string();
    let conn = Connection::open(&db_path).expect("创建测试数据库失败");
    conn.execute_batch(
        "CREATE TABLE societe (
            rowid INTEGER PRIMARY KEY AUTOINCREMENT,
            nom TEXT NOT NULL,
            code_client TEXT,
            fk_typent INTEGER,
            country_code TEXT,
            entity INTEGER,
            import_key TEXT,
            fk_user_creat INTEGER
        );
        CREATE TABLE societe_extrafields (
            rowid INTEGER PRIMARY KEY AUTOINCREMENT,
            fk_object INTEGER,
            niveau TEXT,
            import_key TEXT
        );
        CREATE TABLE c_typent (
            rowid INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT,
            libelle TEXT
        );
        INSERT INTO c_typent (code, libelle) VALUES ('TE_SMALL', '小型企业');
        INSERT INTO c_typent (code, libelle) VALUES ('TE_GROUP', '集团');
        CREATE TABLE c_pays (
            rowid INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT
        );
        INSERT INTO c_pays (code) VALUES ('FR'), ('CN'), ('DE');",
    )
    .expect("建表失败");
    db_path
}

fn create_lookup(db_path: &str) -> SqliteEntityLookup {
    let conn = Connection::open(db_path).expect("打开查询连接失败");
    SqliteEntityLookup::new(Arc::new(Mutex::new(conn))).with_code_series(
        CodeKind::Customer,
        CodeSeries {
            table: "societe".to_string(),
            column: "code_client".to_string(),
            prefix: "CU".to_string(),
            width: 5,
        },
    )
}

/// 测试模板：societe 为父表，societe_extrafields 按回引跟随
fn customer_profile() -> ImportProfile {
    let mut profile = ImportProfile {
        tables: vec![
            TableTarget {
                alias: "s".to_string(),
                name: "societe".to_string(),
                creator_column: Some("fk_user_creat".to_string()),
            },
            TableTarget {
                alias: "extra".to_string(),
                name: "societe_extrafields".to_string(),
                creator_column: None,
            },
        ],
        ..Default::default()
    };
    profile.fields.insert(
        "s.nom".to_string(),
        FieldSpec {
            mandatory: true,
            ..Default::default()
        },
    );
    profile.fields.insert(
        "s.code_client".to_string(),
        FieldSpec {
            convert: Some(ConversionRule::CodeIfAuto(CodeKind::Customer)),
            ..Default::default()
        },
    );
    profile.fields.insert(
        "s.fk_typent".to_string(),
        FieldSpec {
            convert: Some(ConversionRule::FetchIdFromCodeOrLabel(LookupTarget {
                table: "c_typent".to_string(),
                key_columns: vec!["code".to_string()],
                label_column: Some("libelle".to_string()),
                element: None,
                dict: Some("DictionaryCompanyType".to_string()),
            })),
            ..Default::default()
        },
    );
    profile.fields.insert(
        "s.country_code".to_string(),
        FieldSpec {
            validate: Some(ValidationRule::parse("code@c_pays")),
            ..Default::default()
        },
    );
    profile.hidden_fields.push(HiddenField {
        target: FieldRef::parse("extra.fk_object").expect("隐藏字段引用非法"),
        source: HiddenValue::LastRowIdOf("societe".to_string()),
    });
    profile
}

fn customer_mapping() -> ColumnMapping {
    ColumnMapping::from_pairs(vec![
        (1, "s.nom".to_string()),
        (2, "s.code_client".to_string()),
        (3, "s.fk_typent".to_string()),
        (4, "s.country_code".to_string()),
        (5, "extra.niveau".to_string()),
    ])
    .expect("列映射非法")
}

fn csv_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("创建临时 CSV 失败");
    file.write_all(content.as_bytes()).expect("写入 CSV 失败");
    file
}

#[test]
fn test_full_csv_import_flow() {
    logging::init_test();

    let dir = TempDir::new().expect("创建临时目录失败");
    let db_path = create_test_db(&dir);
    let store = SqliteStore::new(&db_path).expect("创建存储失败");
    let lookup = create_lookup(&db_path);

    // 第 2 行: 正常 + 自动编号 + 按标签解析类型
    // 第 3 行: 正常 + 按代码解析类型
    // 第 4 行: 必填缺失
    // 第 5 行: 类型字典未命中
    // 第 6 行: 国家代码存在性校验失败
    let file = csv_file(
        "名称,客户编码,类型,国家,等级\n\
         Acme,auto,集团,FR,A\n\
         Beta,CU00100,TE_SMALL,DE,B\n\
         ,CU00200,TE_SMALL,FR,C\n\
         Gamma,auto,TE_NOPE,FR,D\n\
         Delta,CU00300,TE_SMALL,XX,E\n",
    );

    let ctx = RunContext::new(1, 42).with_import_key("20250823180000");
    let runner = ImportRunner::new(&store, &lookup);
    let result = runner
        .run(
            file.path(),
            &customer_profile(),
            &customer_mapping(),
            &ctx,
            &ReaderOptions::default(),
            &ImportOptions { offset_lines: 1 },
        )
        .expect("导入应整体成功");

    assert_eq!(result.inserted_rows, 2, "应插入 2 行: {:?}", result.errors);
    assert_eq!(result.updated_rows, 0);
    assert_eq!(result.errors.len(), 3);

    // 错误行号与分类可直接对照源文件
    assert_eq!(result.errors[0].row, 4);
    assert!(matches!(result.errors[0].kind, IssueKind::NotNull));
    assert_eq!(result.errors[1].row, 5);
    assert!(matches!(result.errors[1].kind, IssueKind::ForeignKey));
    assert!(result.errors[1].message.contains("DictionaryCompanyType"));
    assert_eq!(result.errors[2].row, 6);
    assert!(matches!(result.errors[2].kind, IssueKind::ForeignKey));

    // Acme: 自动编号从序列起点生成，类型按标签解析到 TE_GROUP
    let acme = store
        .select_ids(
            "societe",
            &[
                ("nom".to_string(), SqlValue::Text("Acme".to_string())),
                ("code_client".to_string(), SqlValue::Text("CU00001".to_string())),
                ("fk_typent".to_string(), SqlValue::Int(2)),
            ],
        )
        .expect("查询 Acme 失败");
    assert_eq!(acme.len(), 1);

    // 批次标签/entity/创建者列全部写入
    let tagged = store
        .select_ids(
            "societe",
            &[
                ("import_key".to_string(), SqlValue::Text("20250823180000".to_string())),
                ("entity".to_string(), SqlValue::Int(1)),
                ("fk_user_creat".to_string(), SqlValue::Int(42)),
            ],
        )
        .expect("查询批次标签失败");
    assert_eq!(tagged.len(), 2);

    // 扩展表按回引跟随父表，失败行不产生扩展记录
    let acme_extra = store
        .select_ids(
            "societe_extrafields",
            &[
                ("fk_object".to_string(), SqlValue::Int(acme[0])),
                ("niveau".to_string(), SqlValue::Text("A".to_string())),
            ],
        )
        .expect("查询扩展表失败");
    assert_eq!(acme_extra.len(), 1);
    assert_eq!(
        store.select_ids("societe_extrafields", &[]).expect("查询扩展表失败").len(),
        2
    );
}

#[test]
fn test_reimport_with_update_keys_updates_in_place() {
    logging::init_test();

    let dir = TempDir::new().expect("创建临时目录失败");
    let db_path = create_test_db(&dir);
    let store = SqliteStore::new(&db_path).expect("创建存储失败");
    let lookup = create_lookup(&db_path);

    let profile = customer_profile();
    let mapping = customer_mapping();
    let runner = ImportRunner::new(&store, &lookup);

    // 首次导入
    let first = csv_file("Acme,CU00001,TE_SMALL,FR,A\n");
    let ctx = RunContext::new(1, 42).with_import_key("batch-1");
    runner
        .run(
            first.path(),
            &profile,
            &mapping,
            &ctx,
            &ReaderOptions::default(),
            &ImportOptions::default(),
        )
        .expect("首次导入失败");

    // 带更新键重导：同名客户按键命中后就地更新，扩展表按回引跟随
    let mut update_profile = profile.clone();
    update_profile.update_keys = vec![FieldRef::parse("s.nom").expect("更新键非法")];
    let second = csv_file("Acme,CU00999,TE_GROUP,DE,Gold\n");
    let ctx = RunContext::new(1, 42).with_import_key("batch-2");
    let result = runner
        .run(
            second.path(),
            &update_profile,
            &mapping,
            &ctx,
            &ReaderOptions::default(),
            &ImportOptions::default(),
        )
        .expect("更新导入失败");

    assert_eq!(result.inserted_rows, 0);
    assert_eq!(result.updated_rows, 1);
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    // 主表仍只有一行，但字段已更新
    let all = store.select_ids("societe", &[]).expect("查询失败");
    assert_eq!(all.len(), 1);
    let updated = store
        .select_ids(
            "societe",
            &[
                ("code_client".to_string(), SqlValue::Text("CU00999".to_string())),
                ("fk_typent".to_string(), SqlValue::Int(2)),
            ],
        )
        .expect("查询失败");
    assert_eq!(updated.len(), 1);

    // 扩展表未新增行，niveau 就地更新
    let extras = store
        .select_ids(
            "societe_extrafields",
            &[("niveau".to_string(), SqlValue::Text("Gold".to_string()))],
        )
        .expect("查询失败");
    assert_eq!(extras.len(), 1);
    assert_eq!(
        store.select_ids("societe_extrafields", &[]).expect("查询失败").len(),
        1
    );
}

#[test]
fn test_semicolon_separator_and_forced_charset() {
    logging::init_test();

    let dir = TempDir::new().expect("创建临时目录失败");
    let db_path = create_test_db(&dir);
    let store = SqliteStore::new(&db_path).expect("创建存储失败");
    let lookup = create_lookup(&db_path);

    // Windows-1252 编码的分号分隔文件
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("创建临时 CSV 失败");
    file.write_all(b"Soci\xe9t\xe9;CU00001;TE_SMALL;FR;A\n")
        .expect("写入 CSV 失败");

    let options = ReaderOptions::default()
        .with_separator(b';')
        .with_forced_charset("windows-1252");
    let runner = ImportRunner::new(&store, &lookup);
    let result = runner
        .run(
            file.path(),
            &customer_profile(),
            &customer_mapping(),
            &RunContext::new(1, 42),
            &options,
            &ImportOptions::default(),
        )
        .expect("导入失败");

    assert_eq!(result.inserted_rows, 1, "{:?}", result.errors);
    let hits = store
        .select_ids(
            "societe",
            &[("nom".to_string(), SqlValue::Text("Société".to_string()))],
        )
        .expect("查询失败");
    assert_eq!(hits.len(), 1);
}

#[test]
fn test_unsupported_extension_fails_before_touching_db() {
    let dir = TempDir::new().expect("创建临时目录失败");
    let db_path = create_test_db(&dir);
    let store = SqliteStore::new(&db_path).expect("创建存储失败");
    let lookup = create_lookup(&db_path);

    let mut file = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .expect("创建临时文件失败");
    file.write_all(b"not a table").expect("写入失败");

    let runner = ImportRunner::new(&store, &lookup);
    let result = runner.run(
        file.path(),
        &customer_profile(),
        &customer_mapping(),
        &RunContext::new(1, 42),
        &ReaderOptions::default(),
        &ImportOptions::default(),
    );
    assert!(result.is_err());
    assert!(store.select_ids("societe", &[]).expect("查询失败").is_empty());
}
