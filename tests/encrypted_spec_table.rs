mod common;

use approx::assert_relative_eq;
use cks::{
    crypt::encrypt_file,
    spec_table::catalog::{CsvPhotometryCatalog, MaxExtinctionTable},
    star_inputs::StarModelInputs,
    AesGcmCipher, CksError, EncryptedStore, SpecTableParser, SymmetricKey,
};
use common::scratch_dir;

const TABLE: &str = "\
1234-01 & $5800 & $4.4 & $0.1 & $3.2 \\\\
752-02 & $5650 & $4.52 & $-0.05 & $2.1 \\\\
not a row & $1 & $2 & $3 & $4
752 & $5700 & $4.50 & $-0.02 & $2.3 \\\\
";

const PHOTOMETRY: &str = "\
name,J,J_unc,H,H_unc,K,K_unc
K01234.01,11.20,0.02,10.90,0.03,10.85,0.02
K00752.01,12.10,0.02,11.75,0.02,11.70,0.03
";

#[test]
fn test_encrypted_table_end_to_end() {
    let (_guard, root) = scratch_dir();
    let plain = root.join("spec.tex");
    let crypt = root.join("spec.tex.crypt");
    let key_path = root.join("spec.key");
    std::fs::write(&plain, TABLE).unwrap();

    let key = SymmetricKey::generate();
    key.write(&key_path).unwrap();
    encrypt_file(&plain, &crypt, &key, &AesGcmCipher).unwrap();
    assert_ne!(std::fs::read_to_string(&crypt).unwrap(), TABLE);

    let catalog = CsvPhotometryCatalog::from_reader(PHOTOMETRY.as_bytes()).unwrap();
    let store = EncryptedStore::new(
        crypt.clone(),
        Some(SymmetricKey::read(&key_path).unwrap()),
        SpecTableParser::with_catalog(catalog),
    );
    assert!(!store.is_loaded());
    assert_eq!(store.decrypted_text().unwrap(), TABLE);

    let table = store.table().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.rejected().len(), 1);
    assert_eq!(table.rejected()[0].line_number, 3);
    assert_eq!(table.overwritten(), 1);

    let star = table.get(1234).unwrap();
    assert_eq!(star.teff, 5800.0);
    assert_relative_eq!(star.logg, 4.4);
    assert_relative_eq!(star.feh, 0.1);
    assert_relative_eq!(star.vsini, 3.2);
    assert_relative_eq!(star.photometry.unwrap().k.value, 10.85);

    // Last line wins for duplicated ids.
    assert_eq!(table.get(752).unwrap().teff, 5700.0);

    // The table is cached: the ciphertext is no longer needed.
    std::fs::remove_file(&crypt).unwrap();
    assert!(std::ptr::eq(table, store.table().unwrap()));
}

#[test]
fn test_wrong_key_never_parses() {
    let (_guard, root) = scratch_dir();
    let plain = root.join("spec.tex");
    let crypt = root.join("spec.tex.crypt");
    std::fs::write(&plain, TABLE).unwrap();
    encrypt_file(&plain, &crypt, &SymmetricKey::generate(), &AesGcmCipher).unwrap();

    let store = EncryptedStore::new(
        crypt,
        Some(SymmetricKey::generate()),
        SpecTableParser::new(),
    );
    assert!(matches!(store.table(), Err(CksError::Decryption(_))));
    assert!(!store.is_loaded());
}

#[test]
fn test_missing_photometry_is_fatal() {
    let (_guard, root) = scratch_dir();
    let path = root.join("spec.tex");
    std::fs::write(
        &path,
        "1234-01 & $5800 & $4.4 & $0.1 & $3.2\n99 & $5000 & $4.0 & $0.0 & $1.0\n",
    )
    .unwrap();

    let catalog = CsvPhotometryCatalog::from_reader(PHOTOMETRY.as_bytes()).unwrap();
    let store = EncryptedStore::new(path, None, SpecTableParser::with_catalog(catalog));
    assert_eq!(
        store.table().unwrap_err(),
        CksError::CatalogLookup {
            id: 99,
            key: "K00099.01".into()
        }
    );
}

#[test]
fn test_star_model_inputs_from_store() {
    let (_guard, root) = scratch_dir();
    let path = root.join("spec.tex");
    std::fs::write(&path, TABLE).unwrap();

    let catalog = CsvPhotometryCatalog::from_reader(PHOTOMETRY.as_bytes()).unwrap();
    let table = EncryptedStore::new(path, None, SpecTableParser::with_catalog(catalog))
        .into_table()
        .unwrap();
    let extinction =
        MaxExtinctionTable::parse("# name AV\nK01234.01 0.35\nK00752.01 0.12\n").unwrap();

    let inputs = StarModelInputs::from_tables(1234, &table, &extinction)
        .unwrap()
        .skip_bands(&["K"]);
    assert_eq!(inputs.get("Teff"), Some((5800.0, 116.0)));
    assert_eq!(inputs.get("J"), Some((11.20, 0.02)));
    assert_eq!(inputs.get("K"), None);
    assert_relative_eq!(inputs.max_av, 0.35);

    assert_eq!(
        StarModelInputs::from_tables(4321, &table, &extinction).unwrap_err(),
        CksError::RecordNotFound(4321)
    );
}
